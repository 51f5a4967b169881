//! Builder output checked against a virtual screen and a standard parser

use pretty_assertions::assert_eq;
use rlterm_terminal::{csi, csi_private, osc, Color, EraseMode, EscapeBuilder, Mode, Request, Style};
use rlterm_test_utils::{Action, CsiRecorder, ScreenProbe};
use test_case::test_case;

#[test]
fn test_cursor_movement() {
    let mut probe = ScreenProbe::new(24, 80);
    probe.apply(&Request::CursorTo { row: 4, column: 9 });
    assert_eq!(probe.cursor(), (4, 9));

    probe.apply(&Request::CursorUp(2));
    assert_eq!(probe.cursor(), (2, 9));

    probe.apply(&Request::CursorBack(4));
    assert_eq!(probe.cursor(), (2, 5));

    probe.apply(&Request::CursorDown(10)).apply(&Request::CursorForward(1));
    assert_eq!(probe.cursor(), (12, 6));

    probe.apply(&Request::CursorColumn(0));
    assert_eq!(probe.cursor(), (12, 0));
}

#[test]
fn test_save_and_restore_cursor() {
    let mut probe = ScreenProbe::default();
    probe
        .apply(&Request::CursorTo { row: 3, column: 3 })
        .apply(&Request::SaveCursor)
        .apply(&Request::CursorTo { row: 10, column: 10 })
        .apply(&Request::RestoreCursor);
    assert_eq!(probe.cursor(), (3, 3));
}

#[test_case(Color::Ansi(1), vt100::Color::Idx(1) ; "base color")]
#[test_case(Color::Bright(2), vt100::Color::Idx(10) ; "bright color")]
#[test_case(Color::Indexed(200), vt100::Color::Idx(200) ; "indexed color")]
#[test_case(Color::Rgb(1, 2, 3), vt100::Color::Rgb(1, 2, 3) ; "rgb color")]
fn test_colors_reach_the_screen(color: Color, expected: vt100::Color) {
    let mut probe = ScreenProbe::default();
    probe
        .apply(&Request::Foreground(color))
        .apply(&Request::Background(color))
        .print("x");
    assert_eq!(probe.fg_at(0, 0), expected);
    assert_eq!(probe.bg_at(0, 0), expected);

    probe.apply(&Request::Foreground(Color::Default)).print("y");
    assert_eq!(probe.fg_at(0, 1), vt100::Color::Default);
    assert_eq!(probe.bg_at(0, 1), expected);
}

#[test]
fn test_style_replaces_previous_attributes() {
    let mut probe = ScreenProbe::default();
    probe
        .apply(&Request::Style(Style::default().bold().italic().fg(Color::Ansi(2))))
        .print("a")
        .apply(&Request::Style(Style::default().underline().reverse()))
        .print("b")
        .apply(&Request::ResetAttributes)
        .print("c");

    let a = probe.cell(0, 0).unwrap();
    assert!(a.bold() && a.italic());
    assert_eq!(a.fgcolor(), vt100::Color::Idx(2));

    let b = probe.cell(0, 1).unwrap();
    assert!(!b.bold() && b.underline() && b.inverse());
    assert_eq!(b.fgcolor(), vt100::Color::Default);

    let c = probe.cell(0, 2).unwrap();
    assert!(!c.underline() && !c.inverse());
}

#[test]
fn test_erase() {
    let mut probe = ScreenProbe::default();
    probe
        .print("hello")
        .apply(&Request::CursorColumn(2))
        .apply(&Request::EraseLine(EraseMode::ToEnd));
    assert_eq!(probe.row_text(0), "he");

    probe.apply(&Request::EraseDisplay(EraseMode::All));
    assert_eq!(probe.row_text(0), "");
}

#[test]
fn test_modes() {
    let mut probe = ScreenProbe::default();
    for mode in [
        Mode::AlternateScreen,
        Mode::BracketedPaste,
        Mode::ApplicationCursorKeys,
        Mode::MouseButtonEvent,
        Mode::MouseSgr,
    ] {
        probe.apply(&Request::SetMode(mode));
    }
    probe.apply(&Request::HideCursor);

    let screen = probe.screen();
    assert!(screen.alternate_screen());
    assert!(screen.bracketed_paste());
    assert!(screen.application_cursor());
    assert!(screen.hide_cursor());
    assert_eq!(screen.mouse_protocol_mode(), vt100::MouseProtocolMode::ButtonMotion);
    assert_eq!(screen.mouse_protocol_encoding(), vt100::MouseProtocolEncoding::Sgr);

    probe
        .apply(&Request::ResetMode(Mode::AlternateScreen))
        .apply(&Request::ResetMode(Mode::MouseButtonEvent))
        .apply(&Request::ShowCursor);
    let screen = probe.screen();
    assert!(!screen.alternate_screen());
    assert!(!screen.hide_cursor());
    assert_eq!(screen.mouse_protocol_mode(), vt100::MouseProtocolMode::None);
}

#[test]
fn test_parser_sees_one_csi_per_request() {
    assert_eq!(
        CsiRecorder::record(csi_private(&[1049], 'h').as_bytes()),
        vec![Action::Csi {
            params: vec![vec![1049]],
            intermediates: vec![b'?'],
            action: 'h',
        }]
    );
    assert_eq!(
        CsiRecorder::record(Request::Foreground(Color::Rgb(1, 2, 3)).encode().as_bytes()),
        vec![Action::Csi {
            params: vec![vec![38], vec![2], vec![1], vec![2], vec![3]],
            intermediates: vec![],
            action: 'm',
        }]
    );
    assert_eq!(
        CsiRecorder::record(csi(&[6], 'n').as_bytes()),
        vec![Action::Csi {
            params: vec![vec![6]],
            intermediates: vec![],
            action: 'n',
        }]
    );
}

/// The parser dispatches the OSC on ESC, then reports the trailing backslash
fn string_terminator() -> Action {
    Action::Esc {
        intermediates: vec![],
        byte: b'\\',
    }
}

#[test]
fn test_parser_sees_osc_and_esc() {
    assert_eq!(
        CsiRecorder::record(Request::SetTitle("rlterm keys".into()).encode().as_bytes()),
        vec![
            Action::Osc(vec![b"2".to_vec(), b"rlterm keys".to_vec()]),
            string_terminator(),
        ]
    );
    assert_eq!(
        CsiRecorder::record(osc(&["1", "icon"]).as_bytes()),
        vec![
            Action::Osc(vec![b"1".to_vec(), b"icon".to_vec()]),
            string_terminator(),
        ]
    );
    assert_eq!(
        CsiRecorder::record(Request::SaveCursor.encode().as_bytes()),
        vec![Action::Esc {
            intermediates: vec![],
            byte: b'7',
        }]
    );
}

#[test]
fn test_builder_writes_cached_bytes() {
    let mut builder = EscapeBuilder::new();
    let mut out = Vec::new();
    for _ in 0..3 {
        builder.write(&mut out, &Request::CursorUp(1)).unwrap();
    }
    builder.write(&mut out, &Request::SetMode(Mode::FocusEvents)).unwrap();

    assert_eq!(out, b"\x1b[1A\x1b[1A\x1b[1A\x1b[?1004h");
    assert_eq!(builder.len(), 2);
}
