//! Core data types for k-mer based template identification.
//!
//! - [`TemplateId`]: identifier of a reference genome in the database
//! - [`KmerParams`]: window length, stride and prefix filter
//! - [`SequenceRecord`], [`TemplateRecord`]: sequences read from input files
//! - [`sequence`]: reverse complement and k-mer window iteration
//!
//! ## Strands
//!
//! Templates are indexed on both strands. Queries are scanned on the forward
//! strand only unless symmetric scanning is requested, so a read taken from the
//! reverse strand of a template still hits the reverse complement k-mers stored
//! for that template.
//!
//! [`TemplateId`]: types::TemplateId
//! [`KmerParams`]: types::KmerParams
//! [`SequenceRecord`]: template::SequenceRecord
//! [`TemplateRecord`]: template::TemplateRecord

pub mod sequence;
pub mod template;
pub mod types;
