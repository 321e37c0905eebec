//! JSON views of match and completion results, for `--json`.

use cligram_engine::{CandidateKind, CgVar, CommandMatch, Completion, MatchError};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum LineReport {
    Matched {
        line: String,
        path: Vec<String>,
        vars: Vec<VarReport>,
        callbacks: Vec<String>,
    },
    Completed {
        line: String,
        word_start: usize,
        partial: String,
        common_prefix: String,
        candidates: Vec<CandidateReport>,
    },
    Failed {
        line: String,
        error: String,
        position: Option<usize>,
    },
}

#[derive(Debug, Serialize)]
pub struct VarReport {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: &'static str,
    pub value: String,
    pub keyword: bool,
}

#[derive(Debug, Serialize)]
pub struct CandidateReport {
    pub text: String,
    pub help: Option<String>,
    pub kind: &'static str,
}

impl LineReport {
    pub fn matched(line: &str, command: &CommandMatch) -> Self {
        LineReport::Matched {
            line: line.to_string(),
            path: command.path.clone(),
            vars: command.vars.iter().map(VarReport::from).collect(),
            callbacks: command
                .callbacks
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        }
    }

    pub fn completed(line: &str, completion: &Completion) -> Self {
        LineReport::Completed {
            line: line.to_string(),
            word_start: completion.word_start,
            partial: completion.partial.clone(),
            common_prefix: completion.common_prefix(),
            candidates: completion
                .candidates
                .iter()
                .map(|c| CandidateReport {
                    text: c.text.clone(),
                    help: c.help.clone(),
                    kind: kind_name(c.kind),
                })
                .collect(),
        }
    }

    pub fn failed(line: &str, error: &MatchError) -> Self {
        LineReport::Failed {
            line: line.to_string(),
            error: error.to_string(),
            position: error.position(),
        }
    }
}

impl From<&CgVar> for VarReport {
    fn from(var: &CgVar) -> Self {
        VarReport {
            name: var.name().map(str::to_string),
            ty: var.ty().name(),
            value: var.to_text(),
            keyword: var.is_keyword(),
        }
    }
}

fn kind_name(kind: CandidateKind) -> &'static str {
    match kind {
        CandidateKind::Keyword => "keyword",
        CandidateKind::Variable => "variable",
        CandidateKind::Expansion => "expansion",
        CandidateKind::EndOfCommand => "end",
    }
}
