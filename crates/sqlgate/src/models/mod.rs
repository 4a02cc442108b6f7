pub mod query_envelope;

pub use query_envelope::{
    EnvelopeFailure, EnvelopeMeta, EnvelopeNotice, QUERY_ENVELOPE_SCHEMA_VERSION, QueryEnvelope,
};
