mod codec;
mod leaf;

pub use codec::{ManifestError, parse, render};
