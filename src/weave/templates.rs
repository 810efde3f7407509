//! Template sets
//!
//! A template set is a plain-data collection of named text templates with
//! `${identifier}` placeholders. The weaver substitutes placeholders by name;
//! an undefined placeholder is an error, unused values are fine. The set
//! carries the woven file's extension, so choosing a set chooses the target
//! markup: the core never commits to a dialect.
//!
//! Three sets ship builtin (`rst`, `html`, `md`); custom sets load from JSON
//! files with the same field names. Escaping of code text is the template
//! set's responsibility, the weaver does not re-escape.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Placeholder substitution failure.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateError {
    /// Which template of the set was being rendered
    pub template: String,
    pub placeholder: String,
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "template: undefined placeholder '${{{}}}' in {}",
            self.placeholder, self.template
        )
    }
}

impl std::error::Error for TemplateError {}

/// Substitute `${name}` placeholders in `template` from `values`.
/// `template_name` labels errors. A `$` not followed by `{` is literal.
pub fn expand_template(
    template_name: &str,
    template: &str,
    values: &HashMap<&str, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == '}' {
                    closed = true;
                    break;
                }
                name.push(inner);
            }
            if !closed {
                return Err(TemplateError {
                    template: template_name.to_string(),
                    placeholder: name,
                });
            }
            match values.get(name.as_str()) {
                Some(value) => out.push_str(value),
                None => {
                    return Err(TemplateError {
                        template: template_name.to_string(),
                        placeholder: name,
                    })
                }
            }
        } else {
            out.push(ch);
        }
    }
    Ok(out)
}

/// The enumerated collection of templates a weaver run needs. Fields default
/// to empty strings so JSON sets may omit templates they never exercise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSet {
    pub name: String,
    /// Extension of the woven document, e.g. `rst`
    pub extension: String,
    /// Document begin/end wrappers; receive `webName` and `date`
    pub doc_head_template: String,
    pub doc_foot_template: String,
    /// Named-chunk body begin/end; receive `seq`, `fullName`, `concat`,
    /// `lineNumber`, `references`
    pub cb_template: String,
    pub ce_template: String,
    /// Output-chunk body begin/end; same fields, `fullName` is the file path
    pub fb_template: String,
    pub fe_template: String,
    /// "Used by" list wrapper and per-item template
    pub ref_template: String,
    pub ref_item_template: String,
    /// A `@<name@>` woven inside a body; receives target `seq`, `fullName`
    pub refto_name_template: String,
    /// A reference rendered by sequence number only, used in xref lists
    pub refto_seq_template: String,
    /// Cross-reference block wrappers and per-item template
    pub xref_head_template: String,
    pub xref_foot_template: String,
    pub xref_item_template: String,
    /// First definition vs subsequent mention of a user identifier
    pub name_def_template: String,
    pub name_ref_template: String,
}

impl TemplateSet {
    /// Look up a shipped set by name.
    pub fn builtin(name: &str) -> Option<TemplateSet> {
        match name {
            "rst" => Some(Self::rst()),
            "html" => Some(Self::html()),
            "md" => Some(Self::md()),
            _ => None,
        }
    }

    /// Load a custom set from a JSON file.
    pub fn from_json_file(path: &Path) -> io::Result<TemplateSet> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    }

    pub fn rst() -> TemplateSet {
        TemplateSet {
            name: "rst".to_string(),
            extension: "rst".to_string(),
            doc_head_template: String::new(),
            doc_foot_template: "\n..\n    Woven from ${webName} on ${date}.\n".to_string(),
            cb_template: "\n..  _`${seq}`:\n..  rubric:: ${fullName} (${seq})${concat}\n..  parsed-literal::\n\n".to_string(),
            ce_template: "\n${references}".to_string(),
            fb_template: "\n..  _`${seq}`:\n..  rubric:: ``${fullName}`` (${seq})${concat}\n..  parsed-literal::\n\n".to_string(),
            fe_template: "\n${references}".to_string(),
            ref_template: "Used by: ${refList}.\n".to_string(),
            ref_item_template: "${fullName} (`${seq}`_)".to_string(),
            refto_name_template: "|srarr| ${fullName} (`${seq}`_)".to_string(),
            refto_seq_template: "`${seq}`_".to_string(),
            xref_head_template: "\n".to_string(),
            xref_foot_template: "\n".to_string(),
            xref_item_template: ":${fullName}:\n    ${refList}\n".to_string(),
            name_def_template: "[`${seq}`_]".to_string(),
            name_ref_template: "`${seq}`_".to_string(),
        }
    }

    pub fn html() -> TemplateSet {
        TemplateSet {
            name: "html".to_string(),
            extension: "html".to_string(),
            doc_head_template:
                "<html>\n<head><title>${webName}</title></head>\n<body>\n".to_string(),
            doc_foot_template:
                "\n<hr/>\n<p>Woven from <code>${webName}</code> on ${date}.</p>\n</body>\n</html>\n"
                    .to_string(),
            cb_template:
                "\n<a name=\"chunk-${seq}\"></a>\n<p><em>${fullName}</em> (${seq})${concat} =</p>\n<pre>\n"
                    .to_string(),
            ce_template: "</pre>\n${references}".to_string(),
            fb_template:
                "\n<a name=\"chunk-${seq}\"></a>\n<p><code>${fullName}</code> (${seq})${concat} =</p>\n<pre>\n"
                    .to_string(),
            fe_template: "</pre>\n${references}".to_string(),
            ref_template: "<p>Used by: ${refList}.</p>\n".to_string(),
            ref_item_template: "<a href=\"#chunk-${seq}\">${fullName} (${seq})</a>".to_string(),
            refto_name_template:
                "<a href=\"#chunk-${seq}\">&rarr; ${fullName} (${seq})</a>".to_string(),
            refto_seq_template: "<a href=\"#chunk-${seq}\">${seq}</a>".to_string(),
            xref_head_template: "<dl>\n".to_string(),
            xref_foot_template: "</dl>\n".to_string(),
            xref_item_template: "<dt>${fullName}</dt><dd>${refList}</dd>\n".to_string(),
            name_def_template: "<strong><a href=\"#chunk-${seq}\">${seq}</a></strong>".to_string(),
            name_ref_template: "<a href=\"#chunk-${seq}\">${seq}</a>".to_string(),
        }
    }

    pub fn md() -> TemplateSet {
        TemplateSet {
            name: "md".to_string(),
            extension: "md".to_string(),
            doc_head_template: String::new(),
            doc_foot_template: "\n---\nWoven from `${webName}`.\n".to_string(),
            cb_template: "\n**`${fullName}` (${seq})${concat}** =\n\n```\n".to_string(),
            ce_template: "```\n${references}".to_string(),
            fb_template: "\n**File `${fullName}` (${seq})${concat}** =\n\n```\n".to_string(),
            fe_template: "```\n${references}".to_string(),
            ref_template: "_Used by: ${refList}._\n".to_string(),
            ref_item_template: "${fullName} (${seq})".to_string(),
            refto_name_template: "<<${fullName} (${seq})>>".to_string(),
            refto_seq_template: "(${seq})".to_string(),
            xref_head_template: "\n".to_string(),
            xref_foot_template: "\n".to_string(),
            xref_item_template: "- `${fullName}`: ${refList}\n".to_string(),
            name_def_template: "**${seq}**".to_string(),
            name_ref_template: "${seq}".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn substitutes_by_name() {
        let vals = values(&[("seq", "3"), ("fullName", "main loop")]);
        assert_eq!(
            expand_template("t", "${fullName} (${seq})", &vals).unwrap(),
            "main loop (3)"
        );
    }

    #[test]
    fn undefined_placeholder_is_an_error() {
        let err = expand_template("cb_template", "${missing}", &HashMap::new()).unwrap_err();
        assert_eq!(err.template, "cb_template");
        assert_eq!(err.placeholder, "missing");
    }

    #[test]
    fn unused_values_are_allowed() {
        let vals = values(&[("seq", "1"), ("unused", "x")]);
        assert_eq!(expand_template("t", "(${seq})", &vals).unwrap(), "(1)");
    }

    #[test]
    fn lone_dollar_is_literal() {
        let vals = values(&[("a", "1")]);
        assert_eq!(
            expand_template("t", "cost: $5 and ${a}", &vals).unwrap(),
            "cost: $5 and 1"
        );
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        assert!(expand_template("t", "${open", &HashMap::new()).is_err());
    }

    #[test]
    fn empty_template_renders_empty() {
        assert_eq!(expand_template("t", "", &HashMap::new()).unwrap(), "");
    }

    #[test]
    fn builtin_sets_resolve_by_name() {
        assert_eq!(TemplateSet::builtin("rst").unwrap().extension, "rst");
        assert_eq!(TemplateSet::builtin("html").unwrap().extension, "html");
        assert_eq!(TemplateSet::builtin("md").unwrap().extension, "md");
        assert!(TemplateSet::builtin("latex").is_none());
    }

    #[test]
    fn json_round_trip() {
        let set = TemplateSet::md();
        let json = serde_json::to_string(&set).unwrap();
        let parsed: TemplateSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }

    #[test]
    fn json_set_may_omit_templates() {
        let parsed: TemplateSet =
            serde_json::from_str(r#"{"name": "tiny", "extension": "txt"}"#).unwrap();
        assert_eq!(parsed.name, "tiny");
        assert_eq!(parsed.cb_template, "");
    }
}
