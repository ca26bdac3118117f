use crate::infra::SessionRecord;
use conformly::assessment::bank::Question;
use conformly::assessment::domain::{AnswerType, Regulation};
use conformly::assessment::providers::ProviderKind;
use conformly::assessment::remediation::TodoItem;
use conformly::assessment::scoring::ScoreResult;
use conformly::assessment::PiiCategory;
use conformly::config::AssessmentConfig;

/// One validation problem, tied to the form field it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldIssue {
    pub(crate) field: &'static str,
    pub(crate) message: String,
}

/// Echo of the intake form, used to re-render it with the user's input after
/// a validation failure. The credential is deliberately never echoed back.
#[derive(Debug, Default, Clone)]
pub(crate) struct IntakeValues {
    pub(crate) company_name: String,
    pub(crate) nif: String,
    pub(crate) company_type: String,
    pub(crate) employees: String,
    pub(crate) regulations: Vec<Regulation>,
    pub(crate) ai_opt_in: bool,
    pub(crate) provider: Option<ProviderKind>,
}

/// What the report page shows in its AI section.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AiOutcome {
    Skipped,
    Blocked(Vec<PiiCategory>),
    Narrative(String),
    Unavailable,
}

pub(crate) fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} - Conformly</title>\n\
         <style>body{{font-family:sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem}}\
         .issue{{color:#a00}}label{{display:block;margin-top:.75rem}}\
         table{{border-collapse:collapse}}td,th{{border:1px solid #ccc;padding:.3rem .6rem}}</style>\n\
         </head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape(title),
        body = body
    )
}

fn issue_for<'a>(issues: &'a [FieldIssue], field: &str) -> Option<&'a FieldIssue> {
    issues.iter().find(|issue| issue.field == field)
}

fn issue_line(issues: &[FieldIssue], field: &str) -> String {
    issue_for(issues, field)
        .map(|issue| format!("<p class=\"issue\">{}</p>", escape(&issue.message)))
        .unwrap_or_default()
}

pub(crate) fn home(
    config: &AssessmentConfig,
    values: &IntakeValues,
    issues: &[FieldIssue],
) -> String {
    let mut body = String::new();
    body.push_str("<p>Answer a short weighted questionnaire and get per-regulation \
                   compliance percentages, a prioritized remediation list, and an \
                   optional anonymized AI analysis using your own provider key.</p>");
    body.push_str("<form method=\"post\" action=\"/consent\">");

    body.push_str(&format!(
        "<label>Company name<br><input name=\"company_name\" value=\"{}\"></label>{}",
        escape(&values.company_name),
        issue_line(issues, "company_name")
    ));
    body.push_str(&format!(
        "<label>NIF / tax id<br><input name=\"nif\" value=\"{}\"></label>{}",
        escape(&values.nif),
        issue_line(issues, "nif")
    ));

    body.push_str("<label>Company type<br><select name=\"company_type\">");
    for kind in &config.company_types {
        let selected = if values.company_type == kind.slug() {
            " selected"
        } else {
            ""
        };
        body.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            kind.slug(),
            selected,
            escape(kind.label())
        ));
    }
    body.push_str("</select></label>");
    body.push_str(&issue_line(issues, "company_type"));

    body.push_str(&format!(
        "<label>Employees<br><input name=\"employees\" value=\"{}\"></label>{}",
        escape(&values.employees),
        issue_line(issues, "employees")
    ));

    body.push_str("<fieldset><legend>Regulations to assess</legend>");
    for regulation in &config.regulations {
        let checked = if values.regulations.contains(regulation) {
            " checked"
        } else {
            ""
        };
        body.push_str(&format!(
            "<label><input type=\"checkbox\" name=\"reg_{}\" value=\"on\"{}> {}</label>",
            regulation.slug(),
            checked,
            escape(regulation.label())
        ));
    }
    body.push_str("</fieldset>");
    body.push_str(&issue_line(issues, "regulations"));

    let opt_in_checked = if values.ai_opt_in { " checked" } else { "" };
    body.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"ai_opt_in\" value=\"on\"{opt_in_checked}> \
         Send an anonymized summary to an AI provider for a narrative analysis</label>"
    ));
    body.push_str("<label>Provider<br><select name=\"provider\">");
    for kind in ProviderKind::ordered() {
        let selected = if values.provider == Some(kind) {
            " selected"
        } else {
            ""
        };
        body.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            kind.slug(),
            selected,
            kind.label()
        ));
    }
    body.push_str("</select></label>");
    body.push_str(&issue_line(issues, "provider"));
    body.push_str(
        "<label>Provider API key (used once, never stored)<br>\
         <input type=\"password\" name=\"api_key\"></label>",
    );
    body.push_str(&issue_line(issues, "api_key"));

    body.push_str("<p><button type=\"submit\">Continue</button></p></form>");
    layout("Compliance self-assessment", &body)
}

pub(crate) fn consent(record: &SessionRecord) -> String {
    let regulations = record
        .profile
        .regulations
        .iter()
        .map(|regulation| regulation.label())
        .collect::<Vec<_>>()
        .join(", ");

    let ai_note = match &record.ai {
        Some(prefs) => format!(
            "<p>AI analysis is <strong>enabled</strong> via {}. Only the alias above, \
             percentages, and normalized answers leave this machine. Your key is used \
             for one request and never stored.</p>",
            prefs.provider.label()
        ),
        None => "<p>AI analysis is <strong>disabled</strong>; nothing leaves this machine.</p>"
            .to_string(),
    };

    let body = format!(
        "<p>Review before starting the questionnaire:</p>\
         <table>\
         <tr><th>Company</th><td>{name}</td></tr>\
         <tr><th>NIF</th><td>{nif}</td></tr>\
         <tr><th>Type</th><td>{kind}</td></tr>\
         <tr><th>Employees</th><td>{employees}</td></tr>\
         <tr><th>Regulations</th><td>{regulations}</td></tr>\
         <tr><th>Alias used externally</th><td><code>{alias}</code></td></tr>\
         </table>\
         {ai_note}\
         <form method=\"post\" action=\"/questionnaire\">\
         <input type=\"hidden\" name=\"csrf_token\" value=\"{csrf}\">\
         <label><input type=\"checkbox\" name=\"consent\" value=\"on\"> \
         I understand how my answers are processed and want to continue</label>\
         <p><button type=\"submit\">Start questionnaire</button></p>\
         </form>",
        name = escape(&record.company_name),
        nif = escape(&record.nif),
        kind = escape(record.profile.company_type.label()),
        employees = record.profile.employee_count,
        regulations = regulations,
        alias = record.profile.alias,
        csrf = escape(&record.csrf_token),
    );
    layout("Consent and preview", &body)
}

pub(crate) fn questionnaire(record: &SessionRecord, questions: &[&Question]) -> String {
    let mut body = String::new();
    if questions.is_empty() {
        body.push_str(
            "<p>No questions are available for the selected regulations. \
             The report will be empty.</p>",
        );
    }
    body.push_str("<form method=\"post\" action=\"/report\">");
    body.push_str(&format!(
        "<input type=\"hidden\" name=\"csrf_token\" value=\"{}\">",
        escape(&record.csrf_token)
    ));

    for question in questions {
        body.push_str(&format!(
            "<label>[{}] {} <em>({})</em><br>",
            escape(question.normative.label()),
            escape(&question.text),
            escape(&question.block)
        ));
        let name = format!("q_{}", question.id);
        match question.answer_type {
            AnswerType::YesNo => {
                body.push_str(&format!(
                    "<select name=\"{name}\">\
                     <option value=\"\">-</option>\
                     <option value=\"1\">Yes</option>\
                     <option value=\"0\">No</option>\
                     </select>"
                ));
            }
            AnswerType::Scale0To5 => {
                body.push_str(&format!("<select name=\"{name}\"><option value=\"\">-</option>"));
                for step in 0..=5 {
                    body.push_str(&format!("<option value=\"{step}\">{step}</option>"));
                }
                body.push_str("</select>");
            }
        }
        body.push_str("</label>");
    }

    body.push_str("<p><button type=\"submit\">Compute report</button></p></form>");
    layout("Questionnaire", &body)
}

pub(crate) fn report(
    record: &SessionRecord,
    scores: &ScoreResult,
    plan: &[TodoItem],
    ai: &AiOutcome,
    generated_on: &str,
) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "<p>Report for <strong>{}</strong> (NIF {}), generated {}.</p>",
        escape(&record.company_name),
        escape(&record.nif),
        escape(generated_on)
    ));

    body.push_str("<h2>Compliance by regulation</h2><table><tr><th>Regulation</th><th>Block</th><th>%</th></tr>");
    for (regulation, percentage) in &scores.regulations {
        body.push_str(&format!(
            "<tr><th>{}</th><td>overall</td><td>{:.2}</td></tr>",
            escape(regulation.label()),
            percentage
        ));
        if let Some(blocks) = scores.blocks.get(regulation) {
            for (block, block_percentage) in blocks {
                body.push_str(&format!(
                    "<tr><td></td><td>{}</td><td>{:.2}</td></tr>",
                    escape(block),
                    block_percentage
                ));
            }
        }
    }
    body.push_str("</table>");

    body.push_str("<h2>Remediation priorities</h2>");
    if plan.is_empty() {
        body.push_str("<p>No gaps above the reporting threshold. Well done.</p>");
    } else {
        body.push_str("<table><tr><th>P</th><th>Regulation</th><th>Block</th><th>Action</th></tr>");
        for item in plan {
            body.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                item.priority,
                escape(item.normative.label()),
                escape(&item.block),
                escape(&item.action)
            ));
        }
        body.push_str("</table>");
    }

    body.push_str("<h2>AI analysis</h2>");
    match ai {
        AiOutcome::Skipped => {
            body.push_str("<p>AI analysis was not requested.</p>");
        }
        AiOutcome::Blocked(categories) => {
            let listed = categories
                .iter()
                .map(|category| escape(category.label()))
                .collect::<Vec<_>>()
                .join(", ");
            body.push_str(&format!(
                "<p class=\"issue\">The outbound summary was blocked before sending: \
                 it appears to contain {listed}. Nothing was transmitted.</p>"
            ));
        }
        AiOutcome::Narrative(text) => {
            body.push_str(&format!("<p>{}</p>", escape(text).replace('\n', "<br>")));
        }
        AiOutcome::Unavailable => {
            body.push_str(
                "<p>AI analysis is unavailable right now; the scores and remediation \
                 list above are complete without it.</p>",
            );
        }
    }

    body.push_str("<p><a href=\"/\">Start a new assessment</a></p>");
    layout("Assessment report", &body)
}
