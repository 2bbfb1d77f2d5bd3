//! Line-oriented template engine.
//!
//! Template text uses the familiar TextFSM shape:
//!
//! ```text
//! Value Required NEIGHBOR_NAME (\S+)
//! Value List HARDWARE (\S+)
//!
//! Start
//!   ^Device ID: ${NEIGHBOR_NAME}
//!   ^Platform: ${PLATFORM}, -> Continue
//!   ^------- -> Record
//! ```
//!
//! Supported value options: `Required`, `Filldown`, `List`. Supported rule
//! actions: `Record`, `Continue`, `Continue.Record`, `Clear` (default is
//! advance to the next line). Anything else is a template parse error -
//! a template that silently degrades would corrupt extraction.
//!
//! Matching runs over one implicit `Start` state: for each input line the
//! rules are tried in order; the first match applies its captures and
//! action. A row is recorded only when every `Required` value is populated.
//! At end of input the current row is recorded if any non-`Filldown` value
//! was assigned since the last record.

use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{template}': {message}")]
    Syntax { template: String, message: String },

    #[error("template '{template}': bad regex in value '{value}': {message}")]
    ValueRegex {
        template: String,
        value: String,
        message: String,
    },

    #[error("template '{template}': bad rule regex '{rule}': {message}")]
    RuleRegex {
        template: String,
        rule: String,
        message: String,
    },

    #[error("template '{template}': rule references undeclared value '{value}'")]
    UnknownValue { template: String, value: String },
}

/// A captured field: scalar for plain values, vector for `List` values
/// (stacked hardware, multiple serials).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Single(String),
    Multi(Vec<String>),
}

impl FieldValue {
    /// First (or only) captured string.
    pub fn first(&self) -> &str {
        match self {
            FieldValue::Single(s) => s,
            FieldValue::Multi(v) => v.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn all(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(s) => vec![s.as_str()],
            FieldValue::Multi(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(s) => s.is_empty(),
            FieldValue::Multi(v) => v.is_empty(),
        }
    }
}

/// One extracted record: value name to captured content.
pub type Record = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ValueOptions {
    required: bool,
    filldown: bool,
    list: bool,
}

#[derive(Debug)]
struct ValueDef {
    name: String,
    options: ValueOptions,
    pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RuleAction {
    Next,
    Record,
    Continue,
    ContinueRecord,
    Clear,
}

#[derive(Debug)]
struct Rule {
    regex: Regex,
    /// Values captured by this rule, in group order.
    captures: Vec<String>,
    action: RuleAction,
}

/// A compiled template.
#[derive(Debug)]
pub struct Template {
    name: String,
    values: Vec<ValueDef>,
    rules: Vec<Rule>,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_names(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name.as_str()).collect()
    }

    /// Compile template text.
    pub fn parse(name: &str, source: &str) -> Result<Template, TemplateError> {
        let mut values: Vec<ValueDef> = Vec::new();
        let mut rules: Vec<Rule> = Vec::new();
        let mut in_state = false;

        for raw_line in source.lines() {
            let line = raw_line.trim_end();
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            if !in_state {
                if let Some(rest) = line.strip_prefix("Value ") {
                    values.push(parse_value_line(name, rest)?);
                    continue;
                }
                if line.trim() == "Start" {
                    in_state = true;
                    continue;
                }
                return Err(TemplateError::Syntax {
                    template: name.to_string(),
                    message: format!("unexpected line before Start state: '{}'", line),
                });
            }

            // Inside Start: rules are indented "  ^pattern [-> Action]".
            let rule_text = line.trim_start();
            if !rule_text.starts_with('^') {
                return Err(TemplateError::Syntax {
                    template: name.to_string(),
                    message: format!("rule must start with '^': '{}'", rule_text),
                });
            }
            rules.push(parse_rule_line(name, rule_text, &values)?);
        }

        if rules.is_empty() {
            return Err(TemplateError::Syntax {
                template: name.to_string(),
                message: "template has no rules".to_string(),
            });
        }

        Ok(Template {
            name: name.to_string(),
            values,
            rules,
        })
    }

    /// Run the template over raw output, returning extracted records.
    pub fn parse_text(&self, output: &str) -> Vec<Record> {
        let mut records = Vec::new();
        let mut row = Row::new(&self.values);

        for line in output.lines() {
            let mut rule_idx = 0;
            while rule_idx < self.rules.len() {
                let rule = &self.rules[rule_idx];
                let Some(caps) = rule.regex.captures(line) else {
                    rule_idx += 1;
                    continue;
                };

                for (group_idx, value_name) in rule.captures.iter().enumerate() {
                    if let Some(m) = caps.get(group_idx + 1) {
                        row.assign(value_name, m.as_str());
                    }
                }

                match rule.action {
                    RuleAction::Next => break,
                    RuleAction::Continue => {
                        rule_idx += 1;
                    }
                    RuleAction::Record => {
                        row.emit(&mut records);
                        break;
                    }
                    RuleAction::ContinueRecord => {
                        row.emit(&mut records);
                        rule_idx += 1;
                    }
                    RuleAction::Clear => {
                        row.clear_non_filldown();
                        break;
                    }
                }
            }
        }

        // Implicit end-of-input record.
        if row.dirty {
            row.emit(&mut records);
        }

        records
    }
}

/// Mutable parse state for the current row.
struct Row<'a> {
    values: &'a [ValueDef],
    current: BTreeMap<String, FieldValue>,
    /// A non-filldown value was assigned since the last record.
    dirty: bool,
}

impl<'a> Row<'a> {
    fn new(values: &'a [ValueDef]) -> Self {
        Self {
            values,
            current: BTreeMap::new(),
            dirty: false,
        }
    }

    fn def(&self, name: &str) -> Option<&ValueDef> {
        self.values.iter().find(|v| v.name == name)
    }

    fn assign(&mut self, name: &str, text: &str) {
        let Some(def) = self.def(name) else { return };
        let list = def.options.list;
        let filldown = def.options.filldown;
        match self.current.entry(name.to_string()) {
            std::collections::btree_map::Entry::Occupied(mut e) => match e.get_mut() {
                FieldValue::Multi(v) if list => v.push(text.to_string()),
                slot => *slot = FieldValue::Single(text.to_string()),
            },
            std::collections::btree_map::Entry::Vacant(e) => {
                if list {
                    e.insert(FieldValue::Multi(vec![text.to_string()]));
                } else {
                    e.insert(FieldValue::Single(text.to_string()));
                }
            }
        }
        if !filldown {
            self.dirty = true;
        }
    }

    /// Record the current row if it satisfies every Required value.
    fn emit(&mut self, records: &mut Vec<Record>) {
        let satisfied = self.values.iter().all(|def| {
            !def.options.required
                || self
                    .current
                    .get(&def.name)
                    .map(|v| !v.is_empty())
                    .unwrap_or(false)
        });
        if satisfied && !self.current.is_empty() {
            records.push(self.current.clone());
        }
        self.clear_non_filldown();
    }

    fn clear_non_filldown(&mut self) {
        let keep: Vec<String> = self
            .values
            .iter()
            .filter(|v| v.options.filldown && !v.options.list)
            .map(|v| v.name.clone())
            .collect();
        self.current.retain(|k, _| keep.contains(k));
        self.dirty = false;
    }
}

fn parse_value_line(template: &str, rest: &str) -> Result<ValueDef, TemplateError> {
    // "Value [options] NAME (pattern)" - options are comma-separated.
    let rest = rest.trim();
    let paren = rest.find('(').ok_or_else(|| TemplateError::Syntax {
        template: template.to_string(),
        message: format!("value line missing pattern: '{}'", rest),
    })?;
    if !rest.ends_with(')') {
        return Err(TemplateError::Syntax {
            template: template.to_string(),
            message: format!("value pattern must end with ')': '{}'", rest),
        });
    }
    let pattern = &rest[paren + 1..rest.len() - 1];
    let head: Vec<&str> = rest[..paren].split_whitespace().collect();
    let (name, option_words) = match head.as_slice() {
        [name] => (*name, &[][..]),
        [opts @ .., name] => (*name, opts),
        [] => {
            return Err(TemplateError::Syntax {
                template: template.to_string(),
                message: format!("value line missing name: '{}'", rest),
            })
        }
    };

    let mut options = ValueOptions {
        required: false,
        filldown: false,
        list: false,
    };
    for word in option_words {
        for opt in word.split(',') {
            match opt {
                "Required" => options.required = true,
                "Filldown" => options.filldown = true,
                "List" => options.list = true,
                other => {
                    return Err(TemplateError::Syntax {
                        template: template.to_string(),
                        message: format!("unsupported value option '{}'", other),
                    })
                }
            }
        }
    }

    // Validate the pattern on its own before substitution. Capturing groups
    // inside a value pattern would shift the rule's group numbering, so only
    // non-capturing groups are allowed.
    let compiled = Regex::new(pattern).map_err(|e| TemplateError::ValueRegex {
        template: template.to_string(),
        value: name.to_string(),
        message: e.to_string(),
    })?;
    if compiled.captures_len() != 1 {
        return Err(TemplateError::ValueRegex {
            template: template.to_string(),
            value: name.to_string(),
            message: "value patterns must use non-capturing groups (?:...)".to_string(),
        });
    }

    Ok(ValueDef {
        name: name.to_string(),
        options,
        pattern: pattern.to_string(),
    })
}

fn parse_rule_line(
    template: &str,
    rule_text: &str,
    values: &[ValueDef],
) -> Result<Rule, TemplateError> {
    let (pattern_part, action) = match rule_text.rsplit_once("->") {
        Some((pat, act)) => {
            let action = match act.trim() {
                "Record" => RuleAction::Record,
                "Continue" => RuleAction::Continue,
                "Continue.Record" => RuleAction::ContinueRecord,
                "Clear" => RuleAction::Clear,
                other => {
                    return Err(TemplateError::Syntax {
                        template: template.to_string(),
                        message: format!("unsupported rule action '{}'", other),
                    })
                }
            };
            (pat.trim_end(), action)
        }
        None => (rule_text, RuleAction::Next),
    };

    // Substitute ${NAME} with capture groups in declaration order of use.
    let mut captures = Vec::new();
    let mut regex_text = String::with_capacity(pattern_part.len());
    let mut rest = pattern_part;
    while let Some(start) = rest.find("${") {
        regex_text.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| TemplateError::Syntax {
            template: template.to_string(),
            message: format!("unterminated value reference in '{}'", rule_text),
        })?;
        let value_name = &after[..end];
        let def = values
            .iter()
            .find(|v| v.name == value_name)
            .ok_or_else(|| TemplateError::UnknownValue {
                template: template.to_string(),
                value: value_name.to_string(),
            })?;
        regex_text.push('(');
        regex_text.push_str(&def.pattern);
        regex_text.push(')');
        captures.push(value_name.to_string());
        rest = &after[end + 1..];
    }
    regex_text.push_str(rest);

    let regex = Regex::new(&regex_text).map_err(|e| TemplateError::RuleRegex {
        template: template.to_string(),
        rule: rule_text.to_string(),
        message: e.to_string(),
    })?;

    Ok(Rule {
        regex,
        captures,
        action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEIGHBOR_TEMPLATE: &str = r#"
Value Required NEIGHBOR_NAME (\S+)
Value MGMT_ADDRESS (\d+\.\d+\.\d+\.\d+)
Value PLATFORM (.+?)

Start
  ^Device ID: ${NEIGHBOR_NAME}
  ^\s+IP address: ${MGMT_ADDRESS}
  ^Platform: ${PLATFORM},
  ^-{5,} -> Record
"#;

    #[test]
    fn records_split_on_separator_and_eof() {
        let t = Template::parse("cisco_ios_show_cdp_neighbors_detail", NEIGHBOR_TEMPLATE).unwrap();
        let output = "\
-------------------------
Device ID: sw1.lab
  IP address: 10.0.0.1
Platform: cisco WS-C3850,  Capabilities: Switch
-------------------------
Device ID: sw2.lab
  IP address: 10.0.0.2
Platform: cisco WS-C2960,  Capabilities: Switch
";
        let records = t.parse_text(output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["NEIGHBOR_NAME"].first(), "sw1.lab");
        assert_eq!(records[1]["MGMT_ADDRESS"].first(), "10.0.0.2");
    }

    #[test]
    fn required_value_gates_record() {
        let t = Template::parse("t", NEIGHBOR_TEMPLATE).unwrap();
        // Separator with no device id in between must not produce a record.
        let records = t.parse_text("----------\n----------\n");
        assert!(records.is_empty());
    }

    #[test]
    fn list_values_accumulate() {
        let src = r#"
Value List SERIAL (\S+)
Value List HARDWARE (\S+)

Start
  ^System Serial Number\s+:\s+${SERIAL}
  ^Model Number\s+:\s+${HARDWARE}
"#;
        let t = Template::parse("stack", src).unwrap();
        let out = "\
Model Number                       : WS-C3850-48T
System Serial Number               : FCW1111A1AA
Model Number                       : WS-C3850-48T
System Serial Number               : FCW2222B2BB
";
        let records = t.parse_text(out);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["SERIAL"].all(), vec!["FCW1111A1AA", "FCW2222B2BB"]);
        assert_eq!(records[0]["HARDWARE"].all().len(), 2);
    }

    #[test]
    fn unknown_action_is_an_error() {
        let src = "Value A (\\S+)\n\nStart\n  ^x ${A} -> Explode\n";
        assert!(matches!(
            Template::parse("t", src),
            Err(TemplateError::Syntax { .. })
        ));
    }

    #[test]
    fn undeclared_value_is_an_error() {
        let src = "Value A (\\S+)\n\nStart\n  ^x ${B}\n";
        assert!(matches!(
            Template::parse("t", src),
            Err(TemplateError::UnknownValue { .. })
        ));
    }

    #[test]
    fn continue_lets_later_rules_see_the_line() {
        let src = r#"
Value PROTO (\S+)
Value ADDR (\d+\.\d+\.\d+\.\d+)

Start
  ^Internet -> Continue
  ^Internet\s+${ADDR} -> Record
"#;
        let t = Template::parse("t", src).unwrap();
        let records = t.parse_text("Internet  10.1.1.1\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["ADDR"].first(), "10.1.1.1");
    }
}
