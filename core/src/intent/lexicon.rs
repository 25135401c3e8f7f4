//! Lexical grammar for cluster-inspection queries
//!
//! A small, deterministic matcher over whitespace tokens. It recognizes verb
//! and kind synonyms, namespace phrases (`-n ns`, `in namespace ns`,
//! `in ns`), flag phrases and a resource name next to the kind word.
//! Namespace and name tokens are captured verbatim; validating them is the
//! policy's job.

use crate::intent::types::{IntentFlag, ResourceKind, Verb};

/// Words mapped to read-only verbs
const LIST_WORDS: &[&str] = &[
    "list", "show", "get", "display", "find", "view", "see", "what", "which", "whats",
];
const DESCRIBE_WORDS: &[&str] = &["describe", "desc", "details", "detail", "inspect", "explain"];
const LOGS_WORDS: &[&str] = &["logs", "log"];

/// Words mapped to mutating verbs (always recognized so they can be denied)
const MUTATING_WORDS: &[(&str, Verb)] = &[
    ("delete", Verb::Delete),
    ("remove", Verb::Delete),
    ("rm", Verb::Delete),
    ("kill", Verb::Delete),
    ("destroy", Verb::Delete),
    ("terminate", Verb::Delete),
    ("apply", Verb::Apply),
    ("create", Verb::Create),
    ("edit", Verb::Edit),
    ("patch", Verb::Patch),
    ("exec", Verb::Exec),
    ("execute", Verb::Exec),
    ("scale", Verb::Scale),
];

/// Mutating operations outside the verb enum
const OTHER_MUTATING_WORDS: &[&str] = &["restart", "rollout", "drain", "cordon", "uncordon", "evict", "label", "annotate", "taint"];

/// Filler words never taken as a name or namespace
const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "available", "can", "cluster", "could",
    "current", "do", "does", "each", "every", "everything", "existing", "failed", "failing",
    "for", "from", "give", "has", "have", "how", "i", "in", "info", "information", "is", "it",
    "let", "lines", "line", "many", "me", "my", "named", "called", "need", "of", "on", "our",
    "pending", "please", "recent", "running", "some", "status", "tell", "that", "the", "them",
    "then", "there", "these", "this", "those", "to", "us", "want", "with", "within", "would",
    "you", "across", "currently", "active",
];

/// Prepositions that introduce a namespace
const NAMESPACE_PREPOSITIONS: &[&str] = &["in", "from", "within"];

/// Result of lexical analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexicalMatch {
    pub verb: Option<Verb>,
    pub kind: Option<ResourceKind>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub flags: Vec<IntentFlag>,
}

struct Tokens {
    words: Vec<String>,
    consumed: Vec<bool>,
}

impl Tokens {
    fn new(text: &str) -> Self {
        let words: Vec<String> = text
            .split_whitespace()
            .map(clean_token)
            .filter(|w| !w.is_empty())
            .collect();
        let consumed = vec![false; words.len()];
        Self { words, consumed }
    }

    fn len(&self) -> usize {
        self.words.len()
    }

    fn get(&self, i: usize) -> Option<&str> {
        self.words.get(i).map(String::as_str)
    }

    fn free(&self, i: usize) -> Option<&str> {
        match self.consumed.get(i) {
            Some(false) => self.get(i),
            _ => None,
        }
    }

    fn consume(&mut self, i: usize) {
        if let Some(slot) = self.consumed.get_mut(i) {
            *slot = true;
        }
    }
}

/// Lowercase and strip sentence punctuation and wrapping quotes
///
/// Shell metacharacters are kept so they reach the policy verbatim.
pub fn clean_token(raw: &str) -> String {
    raw.trim_matches(|c| matches!(c, '"' | '\'' | ',' | '?' | '!'))
        .trim_end_matches(['.', ':'])
        .to_ascii_lowercase()
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

fn is_verb_word(word: &str) -> bool {
    LIST_WORDS.contains(&word)
        || DESCRIBE_WORDS.contains(&word)
        || LOGS_WORDS.contains(&word)
        || MUTATING_WORDS.iter().any(|(w, _)| *w == word)
        || OTHER_MUTATING_WORDS.contains(&word)
}

fn is_keyword(word: &str) -> bool {
    is_stopword(word) || is_verb_word(word) || ResourceKind::from_token(word).is_some()
}

fn is_number(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_digit())
}

/// Analyze a query into its lexical parts
pub fn analyze(text: &str) -> LexicalMatch {
    let mut tokens = Tokens::new(text);
    let mut result = LexicalMatch::default();

    scan_flags(&mut tokens, &mut result);
    result.namespace = scan_namespace(&mut tokens);
    result.verb = scan_verb(&mut tokens);

    let kind_at = scan_kind(&mut tokens, &mut result);
    if result.name.is_none() {
        result.name = scan_name(&mut tokens, kind_at);
    }

    result
}

fn push_flag(result: &mut LexicalMatch, flag: IntentFlag) {
    if !result.flags.contains(&flag) {
        result.flags.push(flag);
    }
}

fn scan_flags(tokens: &mut Tokens, result: &mut LexicalMatch) {
    for i in 0..tokens.len() {
        if tokens.free(i).is_none() {
            continue;
        }
        let word = tokens.words[i].clone();
        let next = tokens.free(i + 1).map(str::to_string);

        match word.as_str() {
            "-a" | "--all-namespaces" => {
                push_flag(result, IntentFlag::AllNamespaces);
                tokens.consume(i);
            }
            "all" if matches!(next.as_deref(), Some("namespaces" | "namespace")) => {
                push_flag(result, IntentFlag::AllNamespaces);
                tokens.consume(i);
                tokens.consume(i + 1);
            }
            "-o" if next.as_deref() == Some("wide") => {
                push_flag(result, IntentFlag::Wide);
                tokens.consume(i);
                tokens.consume(i + 1);
            }
            "wide" | "-owide" | "-o=wide" => {
                push_flag(result, IntentFlag::Wide);
                tokens.consume(i);
            }
            "labels" | "--show-labels" => {
                push_flag(result, IntentFlag::ShowLabels);
                tokens.consume(i);
            }
            "previous" | "--previous" => {
                push_flag(result, IntentFlag::Previous);
                tokens.consume(i);
            }
            "last" | "tail" | "--tail" if next.as_deref().is_some_and(is_number) => {
                if let Some(lines) = next.as_deref().and_then(|n| n.parse::<u32>().ok()) {
                    push_flag(result, IntentFlag::Tail(lines));
                    tokens.consume(i);
                    tokens.consume(i + 1);
                    if matches!(tokens.free(i + 2), Some("lines" | "line")) {
                        tokens.consume(i + 2);
                    }
                }
            }
            other => {
                if let Some(lines) = other
                    .strip_prefix("--tail=")
                    .and_then(|n| n.parse::<u32>().ok())
                {
                    push_flag(result, IntentFlag::Tail(lines));
                    tokens.consume(i);
                }
            }
        }
    }
}

fn scan_namespace(tokens: &mut Tokens) -> Option<String> {
    for i in 0..tokens.len() {
        let Some(word) = tokens.free(i).map(str::to_string) else {
            continue;
        };

        if let Some(ns) = word.strip_prefix("--namespace=") {
            tokens.consume(i);
            return Some(ns.to_string());
        }

        if matches!(word.as_str(), "-n" | "--namespace") {
            if let Some(ns) = tokens.free(i + 1).map(str::to_string) {
                tokens.consume(i);
                tokens.consume(i + 1);
                return Some(ns);
            }
        }

        // "pods namespace prod", but not "describe namespace prod"
        if matches!(word.as_str(), "namespace" | "ns") && mentions_other_kind(tokens, i) {
            if let Some(ns) = tokens.free(i + 1).map(str::to_string) {
                if !is_keyword(&ns) {
                    tokens.consume(i);
                    tokens.consume(i + 1);
                    return Some(ns);
                }
            }
        }

        if !NAMESPACE_PREPOSITIONS.contains(&word.as_str()) {
            continue;
        }

        // "in namespace prod" / "in ns prod"
        if matches!(tokens.free(i + 1), Some("namespace" | "ns")) {
            if let Some(ns) = tokens.free(i + 2).map(str::to_string) {
                tokens.consume(i);
                tokens.consume(i + 1);
                tokens.consume(i + 2);
                return Some(ns);
            }
        }

        // "in prod namespace" / "in kube-system"
        if let Some(candidate) = tokens.free(i + 1).map(str::to_string) {
            if is_keyword(&candidate) || is_number(&candidate) {
                continue;
            }
            tokens.consume(i);
            tokens.consume(i + 1);
            if matches!(tokens.free(i + 2), Some("namespace" | "ns")) {
                tokens.consume(i + 2);
            }
            return Some(candidate);
        }
    }
    None
}

fn mentions_other_kind(tokens: &Tokens, at: usize) -> bool {
    (0..tokens.len()).filter(|&j| j != at).any(|j| {
        tokens
            .free(j)
            .and_then(ResourceKind::from_token)
            .is_some_and(|kind| kind != ResourceKind::Namespace)
    })
}

fn scan_verb(tokens: &mut Tokens) -> Option<Verb> {
    // Mutating words win over read words anywhere in the query.
    for i in 0..tokens.len() {
        let Some(word) = tokens.free(i) else { continue };
        if let Some((_, verb)) = MUTATING_WORDS.iter().find(|(w, _)| *w == word) {
            let verb = verb.clone();
            tokens.consume(i);
            return Some(verb);
        }
        if OTHER_MUTATING_WORDS.contains(&word) {
            let verb = Verb::Other(word.to_string());
            tokens.consume(i);
            return Some(verb);
        }
    }

    let groups: [(&[&str], Verb); 3] = [
        (LOGS_WORDS, Verb::Logs),
        (DESCRIBE_WORDS, Verb::Describe),
        (LIST_WORDS, Verb::List),
    ];
    let mut found = None;
    for (words, verb) in groups.iter() {
        let hits: Vec<usize> = (0..tokens.len())
            .filter(|&i| tokens.free(i).is_some_and(|w| words.contains(&w)))
            .collect();
        if hits.is_empty() {
            continue;
        }
        if found.is_none() {
            found = Some(verb.clone());
        }
        // Consume every verb word so none is mistaken for a name.
        for i in hits {
            tokens.consume(i);
        }
    }
    found
}

/// Returns the index of the kind token, when one was found
fn scan_kind(tokens: &mut Tokens, result: &mut LexicalMatch) -> Option<usize> {
    for i in 0..tokens.len() {
        let Some(word) = tokens.free(i).map(str::to_string) else {
            continue;
        };

        // "pod/frontend-abc"
        if let Some((kind_part, name_part)) = word.split_once('/') {
            if let Some(kind) = ResourceKind::from_token(kind_part) {
                tokens.consume(i);
                result.kind = Some(kind);
                if !name_part.is_empty() {
                    result.name = Some(name_part.to_string());
                }
                return Some(i);
            }
        }

        if let Some(kind) = ResourceKind::from_token(&word) {
            tokens.consume(i);
            result.kind = Some(kind);
            return Some(i);
        }
    }
    None
}

fn is_name_candidate(word: &str) -> bool {
    !is_keyword(word) && !is_number(word) && !word.starts_with('-')
}

fn scan_name(tokens: &mut Tokens, kind_at: Option<usize>) -> Option<String> {
    if let Some(k) = kind_at {
        // "describe service backend"
        if let Some(word) = tokens.free(k + 1).map(str::to_string) {
            if is_name_candidate(&word) {
                tokens.consume(k + 1);
                return Some(word);
            }
        }
        // "backend pod"
        if k > 0 {
            if let Some(word) = tokens.free(k - 1).map(str::to_string) {
                if is_name_candidate(&word) {
                    tokens.consume(k - 1);
                    return Some(word);
                }
            }
        }
    }

    // "logs for frontend-abc"
    for i in 0..tokens.len() {
        if matches!(tokens.get(i), Some("for" | "of" | "named" | "called")) {
            if let Some(word) = tokens.free(i + 1).map(str::to_string) {
                if is_name_candidate(&word) {
                    tokens.consume(i + 1);
                    return Some(word);
                }
            }
        }
    }

    // A long hyphenated token is almost always a generated resource name.
    for i in 0..tokens.len() {
        if let Some(word) = tokens.free(i).map(str::to_string) {
            if word.contains('-') && word.len() > 10 && is_name_candidate(&word) {
                tokens.consume(i);
                return Some(word);
            }
        }
    }

    None
}
