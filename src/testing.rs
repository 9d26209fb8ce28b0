//! Test utilities: a scripted oracle that replays canned replies.

use crate::error::OracleError;
use crate::oracle::{Instruction, InstructionKind, Oracle};
use std::collections::HashMap;
use std::sync::Mutex;

/// An oracle that answers from a table keyed by (kind, URL).
///
/// Every call is recorded so tests can assert how often a URL was visited.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: HashMap<(InstructionKind, String), String>,
    pub calls: Mutex<Vec<(InstructionKind, String)>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, kind: InstructionKind, url: &str, text: &str) -> Self {
        self.replies.insert((kind, url.to_string()), text.to_string());
        self
    }

    /// Number of calls of `kind` made for `url`.
    pub fn call_count(&self, kind: InstructionKind, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, u)| *k == kind && u == url)
            .count()
    }

    /// URLs passed with `kind`, in call order.
    pub fn urls_for(&self, kind: InstructionKind) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, u)| u.clone())
            .collect()
    }
}

impl Oracle for ScriptedOracle {
    async fn fetch_and_instruct(
        &self,
        url: &str,
        instruction: &Instruction,
    ) -> Result<String, OracleError> {
        self.calls
            .lock()
            .unwrap()
            .push((instruction.kind, url.to_string()));
        self.replies
            .get(&(instruction.kind, url.to_string()))
            .cloned()
            .ok_or_else(|| OracleError::Backend(format!("no scripted reply for {url}")))
    }
}

/// Wrap a JSON document in a fenced block surrounded by prose.
pub fn fenced_json(json: &str) -> String {
    format!("Sure, here is what I found:\n```json\n{json}\n```\nAnything else?")
}
