//! Prefix rewriting over raw symbol bytes.
//!
//! A rule `com.example -> shaded.example` is applied in both spellings a JVM
//! archive uses: internal form (`com/example/Foo`, also inside descriptors such
//! as `(Lcom/example/Foo;)V`) and dotted form (`com.example.Foo`). A match must
//! start on a symbol boundary and end on a segment boundary, so
//! `org/com/example` and `com/examples` are left alone.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Internal,
    Dotted,
}

#[derive(Debug, Clone)]
struct Pattern {
    from: Vec<u8>,
    to: Vec<u8>,
    form: Form,
}

/// Compiled relocation rules.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    patterns: Vec<Pattern>,
}

/// Bytes that may precede the `L` of an object type inside a descriptor or signature.
const DESCRIPTOR_LEAD: &[u8] = b"([;<>):+-*^BCDFIJSZ";

fn is_symbol_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b'.')
}

fn at_boundary(input: &[u8], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    let prev = input[i - 1];
    if !is_symbol_byte(prev) {
        return true;
    }
    prev == b'L' && (i == 1 || DESCRIPTOR_LEAD.contains(&input[i - 2]))
}

fn ends_segment(next: Option<&u8>, form: Form) -> bool {
    match (next, form) {
        (None, _) => true,
        (Some(b), Form::Internal) => matches!(b, b'/' | b';' | b'$' | b'<' | b'.'),
        (Some(b), Form::Dotted) => matches!(b, b'.' | b'$'),
    }
}

impl Mapping {
    /// Compile dotted `from -> to` prefixes.
    pub fn new(rules: &BTreeMap<String, String>) -> Self {
        let mut patterns = Vec::with_capacity(rules.len() * 2);
        for (from, to) in rules {
            patterns.push(Pattern {
                from: from.replace('.', "/").into_bytes(),
                to: to.replace('.', "/").into_bytes(),
                form: Form::Internal,
            });
            patterns.push(Pattern {
                from: from.clone().into_bytes(),
                to: to.clone().into_bytes(),
                form: Form::Dotted,
            });
        }
        // Most specific prefix wins.
        patterns.sort_by(|a, b| b.from.len().cmp(&a.from.len()));
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Rewrite every matching prefix. Returns `None` when nothing matched.
    pub fn rewrite(&self, input: &[u8]) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        let mut changed = false;
        let mut i = 0;

        'scan: while i < input.len() {
            if at_boundary(input, i) {
                for p in &self.patterns {
                    if input[i..].starts_with(&p.from)
                        && ends_segment(input.get(i + p.from.len()), p.form)
                    {
                        out.extend_from_slice(&p.to);
                        i += p.from.len();
                        changed = true;
                        continue 'scan;
                    }
                }
            }
            out.push(input[i]);
            i += 1;
        }

        changed.then_some(out)
    }

    /// String convenience over [`Mapping::rewrite`].
    pub fn rewrite_str(&self, input: &str) -> Option<String> {
        // Patterns come from `String`s, so replacing them keeps UTF-8 valid.
        self.rewrite(input.as_bytes())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}
