//! Member serialization
//!
//! Each member is written as its own self-contained document in the
//! configured RDF format.

use crate::crawler::SuppliedMember;
use oxrdfio::{RdfFormat, RdfSerializer};
use std::io::{self, Write};

/// Writes supplied members to an output stream
pub struct MemberWriter<W: Write> {
    format: RdfFormat,
    out: W,
    written: u64,
}

impl<W: Write> MemberWriter<W> {
    pub fn new(format: RdfFormat, out: W) -> Self {
        Self {
            format,
            out,
            written: 0,
        }
    }

    pub fn write_member(&mut self, member: &SuppliedMember) -> io::Result<()> {
        let mut serializer = RdfSerializer::from_format(self.format).for_writer(&mut self.out);
        for triple in member.model.iter() {
            serializer.serialize_triple(triple)?;
        }
        serializer.finish()?;

        if !matches!(self.format, RdfFormat::NTriples | RdfFormat::NQuads) {
            writeln!(self.out)?;
        }
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Number of members written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
