//! Records how a standard escape parser splits up emitted output

use vte::{Params, Parser, Perform};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Print(char),
    Execute(u8),
    Csi {
        params: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        action: char,
    },
    Osc(Vec<Vec<u8>>),
    Esc {
        intermediates: Vec<u8>,
        byte: u8,
    },
}

#[derive(Debug, Default)]
pub struct CsiRecorder {
    pub actions: Vec<Action>,
}

impl CsiRecorder {
    /// Parse `bytes` and return every action seen
    pub fn record(bytes: &[u8]) -> Vec<Action> {
        let mut parser = Parser::new();
        let mut recorder = Self::default();
        for byte in bytes {
            parser.advance(&mut recorder, *byte);
        }
        recorder.actions
    }
}

impl Perform for CsiRecorder {
    fn print(&mut self, c: char) {
        self.actions.push(Action::Print(c));
    }

    fn execute(&mut self, byte: u8) {
        self.actions.push(Action::Execute(byte));
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        self.actions
            .push(Action::Osc(params.iter().map(|p| p.to_vec()).collect()));
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, action: char) {
        self.actions.push(Action::Csi {
            params: params.iter().map(|p| p.to_vec()).collect(),
            intermediates: intermediates.to_vec(),
            action,
        });
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        self.actions.push(Action::Esc {
            intermediates: intermediates.to_vec(),
            byte,
        });
    }
}
