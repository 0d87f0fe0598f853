// SPDX-License-Identifier: MIT

//! JSON Pointer and schema URI handling shared between the compiler and the
//! schema registry.

use core::fmt;

/// A JSON Pointer: a sequence of unescaped reference tokens identifying a
/// location inside a JSON document. Tokens are stored unescaped; RFC 6901
/// escaping (`~0`, `~1`) and percent-encoding are applied on parse and
/// display only.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// Parse the fragment part of a URI (without the leading `#`) into a
    /// pointer. An empty fragment is the whole-document pointer.
    pub fn parse(fragment: &str) -> JsonPointer {
        let tokens = fragment
            .split('/')
            .skip(1)
            .map(|token| unescape(&percent_decode(token)))
            .collect();
        JsonPointer { tokens }
    }

    pub fn append(&self, token: &str) -> JsonPointer {
        let mut tokens = self.tokens.clone();
        tokens.push(token.to_string());
        JsonPointer { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The tokens remaining after `prefix`, or `None` if this pointer does
    /// not start with `prefix`.
    pub(crate) fn strip_prefix(&self, prefix: &JsonPointer) -> Option<&[String]> {
        if self.tokens.len() < prefix.tokens.len() {
            return None;
        }
        let (head, rest) = self.tokens.split_at(prefix.tokens.len());
        if head == prefix.tokens.as_slice() {
            Some(rest)
        } else {
            None
        }
    }

    /// Escape a reference token per RFC 6901: `~` becomes `~0`, `/` becomes
    /// `~1`.
    pub fn escape(token: &str) -> String {
        token.replace('~', "~0").replace('/', "~1")
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", JsonPointer::escape(token))?;
        }
        Ok(())
    }
}

// `~1` must be rewritten before `~0` so that `~01` round-trips to `~1`.
fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn percent_decode(token: &str) -> String {
    if !token.contains('%') {
        return token.to_string();
    }
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let decoded = if bytes[i] == b'%' && i + 3 <= bytes.len() {
            core::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        } else {
            None
        };
        match decoded {
            Some(b) => {
                out.push(b);
                i += 3;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// A schema URI: the pair of an absolute document location and a JSON Pointer
/// into that document. The root document of a compilation has the synthetic
/// location `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonUri {
    location: String,
    pointer: JsonPointer,
}

impl JsonUri {
    pub fn new(uri: &str) -> JsonUri {
        match uri.split_once('#') {
            Some((doc, fragment)) => JsonUri {
                location: if doc.is_empty() {
                    "#".to_string()
                } else {
                    doc.to_string()
                },
                pointer: JsonPointer::parse(fragment),
            },
            None => JsonUri {
                location: uri.to_string(),
                pointer: JsonPointer::default(),
            },
        }
    }

    pub(crate) fn from_parts(location: &str, pointer: JsonPointer) -> JsonUri {
        JsonUri {
            location: location.to_string(),
            pointer,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }

    /// Resolve a reference against this URI as the base: fragment-only
    /// references keep the base document, absolute references replace it, and
    /// relative references are resolved against the base location.
    pub fn derive(&self, reference: &str) -> JsonUri {
        let (doc, fragment) = match reference.split_once('#') {
            Some((doc, fragment)) => (doc, fragment),
            None => (reference, ""),
        };
        let location = if doc.is_empty() {
            self.location.clone()
        } else {
            resolve_location(&self.location, doc)
        };
        JsonUri {
            location,
            pointer: JsonPointer::parse(fragment),
        }
    }

    pub fn append(&self, token: &str) -> JsonUri {
        JsonUri {
            location: self.location.clone(),
            pointer: self.pointer.append(token),
        }
    }

    /// Escape a string so it can be used as a pointer token.
    pub fn escape(token: &str) -> String {
        JsonPointer::escape(token)
    }
}

impl fmt::Display for JsonUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location == "#" {
            write!(f, "#{}", self.pointer)
        } else {
            write!(f, "{}#{}", self.location, self.pointer)
        }
    }
}

fn has_scheme(doc: &str) -> bool {
    let head = doc.split('/').next().unwrap_or("");
    head.contains(':')
}

fn resolve_location(base: &str, doc: &str) -> String {
    if has_scheme(doc) || base == "#" {
        return doc.to_string();
    }

    // Where the path component of the base begins (after scheme and
    // authority, if any).
    let path_start = match base.find("://") {
        Some(i) => {
            let authority = &base[i + 3..];
            match authority.find('/') {
                Some(j) => i + 3 + j,
                None => base.len(),
            }
        }
        None => 0,
    };

    if let Some(stripped) = doc.strip_prefix('/') {
        return format!("{}/{stripped}", &base[..path_start]);
    }

    match base[path_start..].rfind('/') {
        Some(i) => format!("{}{doc}", &base[..path_start + i + 1]),
        None if path_start > 0 => format!("{}/{doc}", &base[..path_start]),
        None => doc.to_string(),
    }
}
