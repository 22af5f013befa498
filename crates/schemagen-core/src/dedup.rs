//! Suppression of one known duplicate constraint in creation scripts.
//!
//! For a many-to-many relation whose foreign key is named after a fixed
//! relation-role string, the builder emits the same `add constraint`
//! statement once per mapping site. Replaying such a script fails with
//! "constraint already exists". Only lines carrying that one signature are
//! candidates for removal; every other line passes through untouched.

/// Relation role whose hashed constraint name collides.
pub const DEFAULT_KEY_HINT: &str = "observationHasOffering";

/// `String.hashCode` as defined by the JVM: UTF-16 code units, wrapping
/// 32-bit arithmetic. Constraint names derived by the builder use it.
pub fn java_string_hash(s: &str) -> i32 {
  s.encode_utf16()
    .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Name of the constraint derived from `role`: `FK` followed by the
/// uppercase, unpadded two's complement hex of its hash.
pub fn constraint_name(role: &str) -> String {
  format!("FK{:X}", java_string_hash(role) as u32)
}

/// Keep the first line containing the signature for `key_hint`, drop every
/// later one. Order of the remaining lines is preserved.
pub fn dedupe<S: AsRef<str>>(lines: &[S], key_hint: &str) -> Vec<String> {
  let signature = constraint_name(key_hint);
  let mut seen = false;
  let mut dropped = 0usize;
  let mut out = Vec::with_capacity(lines.len());
  for line in lines {
    let line = line.as_ref();
    if line.contains(&signature) {
      if seen {
        dropped += 1;
        continue;
      }
      seen = true;
    }
    out.push(line.to_string());
  }
  if dropped > 0 {
    tracing::warn!(%signature, dropped, "dropped duplicate constraint statements");
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_matches_jvm() {
    assert_eq!(java_string_hash(""), 0);
    assert_eq!(java_string_hash("a"), 97);
    assert_eq!(java_string_hash("hello"), 99_162_322);
    // Overflowing hashes go negative like the JVM's.
    assert_eq!(java_string_hash("polygenelubricants"), i32::MIN);
  }

  #[test]
  fn negative_hash_renders_as_unsigned_hex() {
    assert_eq!(constraint_name("polygenelubricants"), "FK80000000");
    assert_eq!(constraint_name("hello"), "FK5E918D2");
  }

  #[test]
  fn keeps_first_signature_line_only() {
    let sig = constraint_name(DEFAULT_KEY_HINT);
    let dup = format!("alter table observation_offering add constraint {sig} foreign key (fk_offering_id) references offering");
    let lines = vec![
      "create table a (id int8)".to_string(),
      dup.clone(),
      "create table b (id int8)".to_string(),
      dup.clone(),
      "alter table b add constraint FK1 foreign key (x) references a".to_string(),
    ];

    let out = dedupe(&lines, DEFAULT_KEY_HINT);

    assert_eq!(out, vec![
      "create table a (id int8)".to_string(),
      dup.clone(),
      "create table b (id int8)".to_string(),
      "alter table b add constraint FK1 foreign key (x) references a".to_string(),
    ]);
    assert_eq!(out.iter().filter(|l| l.contains(&sig)).count(), 1);
  }

  #[test]
  fn unrelated_duplicates_are_kept() {
    let lines = ["drop table a", "drop table a"];
    assert_eq!(dedupe(&lines, DEFAULT_KEY_HINT), ["drop table a", "drop table a"]);
  }

  #[test]
  fn different_hint_targets_different_lines() {
    let sig = constraint_name("datasetHasTag");
    let lines = [format!("x {sig}"), format!("y {sig}"), "z".to_string()];
    assert_eq!(dedupe(&lines, "datasetHasTag").len(), 2);
    assert_eq!(dedupe(&lines, DEFAULT_KEY_HINT).len(), 3);
  }
}
