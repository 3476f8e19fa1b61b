use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    MoveToTop,
    MoveToBottom,
    SyncFeed,
    ToggleVisible,
    DeleteDevotional,
    OpenInBrowser,
    CycleFilter,
    ShowHelp,
    HideHelp,
}

pub fn handle_key_event(key: KeyEvent, show_help: bool) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => Some(AppAction::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),

        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(AppAction::MoveDown),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(AppAction::MoveUp),
        (KeyCode::Char('<'), _) | (KeyCode::Home, _) => Some(AppAction::MoveToTop),
        (KeyCode::Char('>'), _) | (KeyCode::End, _) => Some(AppAction::MoveToBottom),

        (KeyCode::Char('r'), _) => Some(AppAction::SyncFeed),
        (KeyCode::Char('v'), _) => Some(AppAction::ToggleVisible),
        (KeyCode::Char('d'), KeyModifiers::NONE) => Some(AppAction::DeleteDevotional),
        (KeyCode::Char('o'), _) => Some(AppAction::OpenInBrowser),
        (KeyCode::Char('f'), _) => Some(AppAction::CycleFilter),

        (KeyCode::Char('?'), _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn help_swallows_any_key() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('d')), true),
            Some(AppAction::HideHelp)
        );
    }

    #[test]
    fn normal_mode_bindings() {
        assert_eq!(handle_key_event(key(KeyCode::Char('r')), false), Some(AppAction::SyncFeed));
        assert_eq!(handle_key_event(key(KeyCode::Char('v')), false), Some(AppAction::ToggleVisible));
        assert_eq!(handle_key_event(key(KeyCode::Down), false), Some(AppAction::MoveDown));
        assert_eq!(
            handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), false),
            Some(AppAction::Quit)
        );
        assert_eq!(handle_key_event(key(KeyCode::Char('z')), false), None);
    }
}
