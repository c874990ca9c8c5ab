/// Outcome of offering a key to a component.
///
/// Overlays (prompt, confirm, command line) return this so the owning view
/// knows whether to keep routing the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
