use crate::BytePosition;

/// Byte range of a node inside its compilation unit.
///
/// Analysis is per-unit, so spans carry no file identity; the host that
/// handed us the tree knows which unit the result belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Span {
  pub start: BytePosition,
  pub end: BytePosition,
}

impl Span {
  /// # Panics
  /// In debug builds, when `start > end`.
  pub fn new(
    start: BytePosition,
    end: BytePosition,
  ) -> Self {
    debug_assert!(start <= end, "span start {} past end {}", start, end);
    Self { start, end }
  }

}

impl std::fmt::Display for Span {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "(span start: {} end: {})", self.start, self.end)
  }
}
