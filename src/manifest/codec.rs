use std::borrow::Cow;

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml, YamlEmitter};
use snafu::prelude::*;
use tracing::debug;

use super::leaf::{Leaf, render_leaf};
use crate::sync::{Children, ContentHash, ContentHashParseError, Entry, path};

/// Parses a snapshot manifest.
///
/// Mappings are directories and string scalars are leaves. A null or empty
/// document describes an absent root.
pub fn parse(contents: &str) -> Result<Entry, ManifestError> {
    let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
    let Some(root) = documents.first() else {
        debug!("Manifest is empty, treating root as absent");
        return Ok(Entry::Absent);
    };

    match root {
        Yaml::Value(Scalar::Null) => Ok(Entry::Absent),
        node => parse_node("", node),
    }
}

fn parse_node(node_path: &str, node: &Yaml) -> Result<Entry, ManifestError> {
    match node {
        Yaml::Mapping(mapping) => parse_directory(node_path, mapping),
        Yaml::Value(Scalar::String(value)) => parse_leaf(node_path, value),
        Yaml::Value(Scalar::Null) => NestedNullSnafu {
            path: path::display(node_path),
        }
        .fail(),
        _ => UnsupportedNodeSnafu {
            path: path::display(node_path),
        }
        .fail(),
    }
}

fn parse_directory(
    node_path: &str,
    mapping: &LinkedHashMap<Yaml, Yaml>,
) -> Result<Entry, ManifestError> {
    let mut children = Children::new();
    for (key, value) in mapping {
        let Yaml::Value(Scalar::String(name)) = key else {
            return NonStringKeySnafu {
                path: path::display(node_path),
            }
            .fail();
        };
        ensure!(
            path::is_valid_name(name),
            InvalidNameSnafu {
                path: path::display(node_path),
                name: name.to_string(),
            }
        );

        let child_path = path::join(node_path, name);
        children.insert(name.to_string(), parse_node(&child_path, value)?);
    }

    Ok(Entry::directory(children))
}

fn parse_leaf(node_path: &str, value: &str) -> Result<Entry, ManifestError> {
    let leaf = Leaf::parse(value).context(InvalidLeafSnafu {
        path: path::display(node_path),
        value,
    })?;

    let entry = match leaf {
        Leaf::File { digest, executable } => {
            let digest = digest.parse::<ContentHash>().context(InvalidDigestSnafu {
                path: path::display(node_path),
            })?;
            if executable {
                Entry::executable_file(digest)
            } else {
                Entry::file(digest)
            }
        }
        Leaf::Text(literal) => Entry::file(ContentHash::of(literal)),
        Leaf::Link(target) => Entry::symlink(target),
    };
    Ok(entry)
}

/// Renders a snapshot as a manifest that [`parse`] reads back to the same
/// snapshot. Files are always written in digest form.
pub fn render(entry: &Entry) -> Result<String, ManifestError> {
    let yaml = to_yaml(entry);
    let mut rendered = String::new();
    YamlEmitter::new(&mut rendered)
        .dump(&yaml)
        .context(EmitSnafu)?;
    rendered.push('\n');
    Ok(rendered)
}

fn to_yaml(entry: &Entry) -> Yaml<'static> {
    match entry {
        Entry::Directory { children } => {
            let mapping = children
                .iter()
                .map(|(name, child)| {
                    (
                        Yaml::Value(Scalar::String(Cow::Owned(name.clone()))),
                        to_yaml(child),
                    )
                })
                .collect::<LinkedHashMap<_, _>>();
            Yaml::Mapping(mapping)
        }
        leaf => match render_leaf(leaf) {
            Some(value) => Yaml::Value(Scalar::String(Cow::Owned(value))),
            None => Yaml::Value(Scalar::Null),
        },
    }
}

#[derive(Debug, Snafu)]
pub enum ManifestError {
    #[snafu(display("Failed to parse the manifest"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Invalid entry at '{}': '{}' is not a file, exec, text or link leaf", path, value))]
    InvalidLeafError { path: String, value: String },
    #[snafu(display("Invalid file digest at '{}'", path))]
    InvalidDigestError {
        path: String,
        source: ContentHashParseError,
    },
    #[snafu(display("Invalid child name '{}' in '{}'", name, path))]
    InvalidNameError { path: String, name: String },
    #[snafu(display("Directory '{}' has a non-string key", path))]
    NonStringKeyError { path: String },
    #[snafu(display("Entry '{}' is null; only the root may be absent", path))]
    NestedNullError { path: String },
    #[snafu(display("Entry '{}' is neither a mapping nor a string", path))]
    UnsupportedNodeError { path: String },
    #[snafu(display("Failed to emit the manifest"))]
    EmitError { source: saphyr::EmitError },
}
