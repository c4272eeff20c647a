pub mod fingerprint;
pub mod matcher;
pub mod protocol_model;
