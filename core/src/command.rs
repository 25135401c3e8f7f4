//! Command rendering
//!
//! Maps an allowed intent onto a fixed argument template per verb. User
//! supplied values only ever land in positional slots or as the value of
//! `-n`; flags come from a closed set of literal strings.

use crate::intent::{Intent, IntentFlag, ResourceKind, Verb};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Rendering refused to produce a command
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("verb '{0}' has no command template")]
    UnsupportedVerb(String),

    #[error("resource kind '{0}' has no command template")]
    UnsupportedKind(String),

    #[error("intent has no resource kind")]
    MissingKind,

    #[error("{0} requires a resource name")]
    MissingName(&'static str),

    /// A user value would be read as a flag
    #[error("{field} value '{value}' cannot be used as an argument")]
    UnsafeArgument { field: &'static str, value: String },
}

/// Program plus discrete arguments, never passed through a shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCommand {
    program: String,
    args: Vec<String>,
}

impl RenderedCommand {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Shell-quoted form for logs and audit; never executed
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn positional(field: &'static str, value: &str) -> Result<String, RenderError> {
    if value.is_empty() || value.starts_with('-') {
        return Err(RenderError::UnsafeArgument {
            field,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

fn known_kind(intent: &Intent) -> Result<&ResourceKind, RenderError> {
    let kind = intent.resource_kind.as_ref().ok_or(RenderError::MissingKind)?;
    if !kind.is_known() {
        return Err(RenderError::UnsupportedKind(kind.to_string()));
    }
    Ok(kind)
}

fn push_scope(args: &mut Vec<String>, intent: &Intent, kind: &ResourceKind) -> Result<(), RenderError> {
    if intent.has_flag(IntentFlag::AllNamespaces) {
        args.push("-A".to_string());
    } else if let Some(ns) = &intent.namespace {
        if !kind.is_cluster_scoped() {
            args.push("-n".to_string());
            args.push(positional("namespace", ns)?);
        }
    }
    Ok(())
}

/// Render an intent through its verb template
///
/// - get/list: `<bin> get <kind> [name] [-n ns | -A] [-o wide] [--show-labels]`
/// - describe: `<bin> describe <kind> [name] [-n ns | -A]`
/// - logs: `<bin> logs <name | kind/name> [-n ns] [--previous] [--tail=N]`
pub fn render(binary: &str, intent: &Intent) -> Result<RenderedCommand, RenderError> {
    let kind = known_kind(intent)?;
    let name = intent
        .resource_name
        .as_deref()
        .map(|name| positional("resource name", name))
        .transpose()?;

    let mut args = Vec::new();
    match &intent.verb {
        Verb::Get | Verb::List => {
            args.push("get".to_string());
            args.push(kind.cli_name().to_string());
            args.extend(name);
            push_scope(&mut args, intent, kind)?;
            if intent.has_flag(IntentFlag::Wide) {
                args.push("-o".to_string());
                args.push("wide".to_string());
            }
            if intent.has_flag(IntentFlag::ShowLabels) {
                args.push("--show-labels".to_string());
            }
        }
        Verb::Describe => {
            args.push("describe".to_string());
            args.push(kind.cli_name().to_string());
            args.extend(name);
            push_scope(&mut args, intent, kind)?;
        }
        Verb::Logs => {
            let name = name.ok_or(RenderError::MissingName("logs"))?;
            args.push("logs".to_string());
            if *kind == ResourceKind::Pod {
                args.push(name);
            } else {
                args.push(format!("{}/{}", kind.as_str(), name));
            }
            if let Some(ns) = &intent.namespace {
                args.push("-n".to_string());
                args.push(positional("namespace", ns)?);
            }
            if intent.has_flag(IntentFlag::Previous) {
                args.push("--previous".to_string());
            }
            if let Some(lines) = intent.tail_lines() {
                args.push(format!("--tail={}", lines));
            }
        }
        other => return Err(RenderError::UnsupportedVerb(other.to_string())),
    }

    Ok(RenderedCommand {
        program: binary.to_string(),
        args,
    })
}

/// Render the name listing used for resource name resolution
pub fn render_listing(
    binary: &str,
    kind: &ResourceKind,
    namespace: Option<&str>,
) -> Result<RenderedCommand, RenderError> {
    if !kind.is_known() {
        return Err(RenderError::UnsupportedKind(kind.to_string()));
    }
    let mut args = vec!["get".to_string(), kind.cli_name().to_string()];
    if let Some(ns) = namespace.filter(|_| !kind.is_cluster_scoped()) {
        args.push("-n".to_string());
        args.push(positional("namespace", ns)?);
    }
    args.push("--no-headers".to_string());
    args.push("-o".to_string());
    args.push("custom-columns=NAME:.metadata.name".to_string());

    Ok(RenderedCommand {
        program: binary.to_string(),
        args,
    })
}

#[cfg(test)]
pub(crate) fn raw_command(program: &str, args: &[&str]) -> RenderedCommand {
    RenderedCommand {
        program: program.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(cmd: &RenderedCommand) -> Vec<&str> {
        cmd.args().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_list_template() {
        let intent = Intent::new(Verb::List, ResourceKind::Pod, "list pods").in_namespace("default");
        let cmd = render("kubectl", &intent).unwrap();
        assert_eq!(cmd.program(), "kubectl");
        assert_eq!(argv(&cmd), vec!["get", "pods", "-n", "default"]);
    }

    #[test]
    fn test_get_with_flags() {
        let intent = Intent::new(Verb::Get, ResourceKind::Deployment, "q")
            .with_name("api")
            .with_flag(IntentFlag::AllNamespaces)
            .with_flag(IntentFlag::Wide)
            .with_flag(IntentFlag::ShowLabels);
        let cmd = render("kubectl", &intent).unwrap();
        assert_eq!(
            argv(&cmd),
            vec!["get", "deployments", "api", "-A", "-o", "wide", "--show-labels"]
        );
    }

    #[test]
    fn test_cluster_scoped_skips_namespace() {
        let intent = Intent::new(Verb::Describe, ResourceKind::Node, "q")
            .with_name("worker-1")
            .in_namespace("default");
        let cmd = render("kubectl", &intent).unwrap();
        assert_eq!(argv(&cmd), vec!["describe", "nodes", "worker-1"]);
    }

    #[test]
    fn test_logs_template() {
        let intent = Intent::new(Verb::Logs, ResourceKind::Pod, "q")
            .with_name("web-1")
            .in_namespace("prod")
            .with_flag(IntentFlag::Previous)
            .with_flag(IntentFlag::Tail(100));
        let cmd = render("kubectl", &intent).unwrap();
        assert_eq!(
            argv(&cmd),
            vec!["logs", "web-1", "-n", "prod", "--previous", "--tail=100"]
        );

        let intent = Intent::new(Verb::Logs, ResourceKind::Deployment, "q").with_name("api");
        let cmd = render("kubectl", &intent).unwrap();
        assert_eq!(argv(&cmd), vec!["logs", "deployment/api"]);
    }

    #[test]
    fn test_logs_without_name_is_refused() {
        let intent = Intent::new(Verb::Logs, ResourceKind::Pod, "q");
        assert_eq!(
            render("kubectl", &intent),
            Err(RenderError::MissingName("logs"))
        );
    }

    #[test]
    fn test_dash_positionals_are_refused() {
        let intent = Intent::new(Verb::Get, ResourceKind::Pod, "q").with_name("--all");
        assert!(matches!(
            render("kubectl", &intent),
            Err(RenderError::UnsafeArgument { field: "resource name", .. })
        ));

        let intent = Intent::new(Verb::List, ResourceKind::Pod, "q").in_namespace("-A");
        assert!(matches!(
            render("kubectl", &intent),
            Err(RenderError::UnsafeArgument { field: "namespace", .. })
        ));
    }

    #[test]
    fn test_mutating_and_unknown_kinds_have_no_template() {
        let intent = Intent::new(Verb::Delete, ResourceKind::Pod, "q").with_name("x");
        assert_eq!(
            render("kubectl", &intent),
            Err(RenderError::UnsupportedVerb("delete".into()))
        );

        let intent = Intent::new(Verb::List, ResourceKind::Other("widgets".into()), "q");
        assert!(matches!(
            render("kubectl", &intent),
            Err(RenderError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_listing_template() {
        let cmd = render_listing("kubectl", &ResourceKind::Pod, Some("prod")).unwrap();
        assert_eq!(
            argv(&cmd),
            vec![
                "get",
                "pods",
                "-n",
                "prod",
                "--no-headers",
                "-o",
                "custom-columns=NAME:.metadata.name"
            ]
        );
    }

    #[test]
    fn test_display_quotes_metacharacters() {
        let cmd = raw_command("kubectl", &["get", "pods", "a;b", "it's"]);
        assert_eq!(cmd.display(), r#"kubectl get pods 'a;b' 'it'\''s'"#);
    }
}
