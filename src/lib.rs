//! kubeassist
//!
//! Command-line entry point for the read-only cluster assistant. The query
//! pipeline lives in `kubeassist-core` and the HTTP surface in
//! `kubeassist-api`.

pub mod cli;
