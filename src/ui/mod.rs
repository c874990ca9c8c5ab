pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::widgets::TableState;

/// Keep the table selection inside `0..len`, selecting the first row when
/// rows appear and clearing it when they are gone.
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(4));
    ensure_valid_selection(&mut state, 2);
    assert_eq!(state.selected(), Some(1));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
