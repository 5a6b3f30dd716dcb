pub mod mfapi;

pub use mfapi::MfApiProvider;
