//! JVM class-file constant pool rewriting.
//!
//! Every symbolic reference in a class file (class names, descriptors,
//! signatures, string literals) bottoms out in a `CONSTANT_Utf8` pool entry.
//! Rewriting those entries and copying everything after the pool verbatim is
//! enough to move a class into another package: indices do not change, only
//! the byte length of the rewritten entries.

use thiserror::Error;

use super::mapping::Mapping;

/// `0xCAFEBABE`
pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("Truncated class file at offset {0}")]
    Truncated(usize),

    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("Constant pool entry {0} exceeds 65535 bytes after relocation")]
    TooLong(u16),
}

pub fn is_class_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

fn read_u16(bytes: &[u8], pos: usize) -> Result<u16, ClassFileError> {
    bytes
        .get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(ClassFileError::Truncated(pos))
}

fn take(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8], ClassFileError> {
    bytes.get(pos..pos + len).ok_or(ClassFileError::Truncated(pos))
}

/// Rewrite a class file's constant pool through `mapping`.
///
/// Returns `Ok(None)` if no entry changed.
///
/// # Errors
///
/// Returns a [`ClassFileError`] if the constant pool is truncated, holds an
/// unknown tag, or a rewritten entry no longer fits in a `u16` length.
pub fn relocate_class(bytes: &[u8], mapping: &Mapping) -> Result<Option<Vec<u8>>, ClassFileError> {
    // magic, minor, major
    take(bytes, 0, 8)?;
    let count = read_u16(bytes, 8)?;

    let mut out = Vec::with_capacity(bytes.len() + 64);
    out.extend_from_slice(&bytes[..10]);

    let mut pos = 10;
    let mut changed = false;
    let mut index: u16 = 1;

    while index < count {
        let tag = *bytes.get(pos).ok_or(ClassFileError::Truncated(pos))?;
        let body_len = match tag {
            TAG_UTF8 => {
                let len = read_u16(bytes, pos + 1)? as usize;
                let data = take(bytes, pos + 3, len)?;
                if let Some(rewritten) = mapping.rewrite(data) {
                    let new_len =
                        u16::try_from(rewritten.len()).map_err(|_| ClassFileError::TooLong(index))?;
                    out.push(TAG_UTF8);
                    out.extend_from_slice(&new_len.to_be_bytes());
                    out.extend_from_slice(&rewritten);
                    changed = true;
                    pos += 3 + len;
                    index += 1;
                    continue;
                }
                2 + len
            }
            TAG_INTEGER | TAG_FLOAT => 4,
            TAG_LONG | TAG_DOUBLE => 8,
            TAG_CLASS | TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => 2,
            TAG_FIELDREF
            | TAG_METHODREF
            | TAG_INTERFACE_METHODREF
            | TAG_NAME_AND_TYPE
            | TAG_DYNAMIC
            | TAG_INVOKE_DYNAMIC => 4,
            TAG_METHOD_HANDLE => 3,
            _ => return Err(ClassFileError::UnknownTag { tag, index }),
        };

        out.extend_from_slice(take(bytes, pos, 1 + body_len)?);
        pos += 1 + body_len;
        // 8-byte constants occupy two pool slots.
        index += if matches!(tag, TAG_LONG | TAG_DOUBLE) { 2 } else { 1 };
    }

    if !changed {
        return Ok(None);
    }

    out.extend_from_slice(&bytes[pos..]);
    Ok(Some(out))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mapping() -> Mapping {
        let mut rules = BTreeMap::new();
        rules.insert("com.example".to_string(), "shaded.example".to_string());
        Mapping::new(&rules)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_rewrites_pool_and_keeps_tail() {
        let input = build::class(
            "com/example/Foo",
            "java/lang/Object",
            &["(Lcom/example/Bar;)V", "com.example.Baz"],
        );
        let out = relocate_class(&input, &mapping()).unwrap().unwrap();

        assert!(is_class_file(&out));
        assert!(contains(&out, b"shaded/example/Foo"));
        assert!(contains(&out, b"(Lshaded/example/Bar;)V"));
        assert!(contains(&out, b"shaded.example.Baz"));
        assert!(contains(&out, b"java/lang/Object"));
        assert!(!contains(&out, b"com/example"));
        // Long constant survives and the trailing class body is untouched.
        assert!(contains(&out, &0x0102_0304_0506_0708_u64.to_be_bytes()));
        assert!(out.ends_with(&[0x00, 0x21, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(out.len(), input.len() + 3 * ("shaded".len() - "com".len()));
    }

    #[test]
    fn test_untouched_class_returns_none() {
        let input = build::class("org/other/Foo", "java/lang/Object", &[]);
        assert_eq!(relocate_class(&input, &mapping()).unwrap(), None);
    }

    #[test]
    fn test_truncated_pool() {
        let input = build::class("com/example/Foo", "java/lang/Object", &[]);
        let err = relocate_class(&input[..14], &mapping()).unwrap_err();
        assert!(matches!(err, ClassFileError::Truncated(_)));
    }

    #[test]
    fn test_unknown_tag() {
        let mut input = build::class("com/example/Foo", "java/lang/Object", &[]);
        input[10] = 2;
        assert_eq!(
            relocate_class(&input, &mapping()),
            Err(ClassFileError::UnknownTag { tag: 2, index: 1 })
        );
    }
}
