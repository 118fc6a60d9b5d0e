//! Two-sheet workbook for the result of one Jira query.
//!
//! Sheet `Jira issues` lists one row per issue under a bold header row.
//! Sheet `Report Details` records how and when the report was produced.

use chrono::{Duration, NaiveDateTime};
use rust_xlsxwriter::{Format, FormatAlign, FormatPattern, Workbook, Worksheet};

use crate::records::{required, required_ref};
use crate::{DocumentKind, EvidenceDocument, FormatError, IssueQueryEvidence, JiraIssue, RecordId, SourceTimestamp};

/// Local mirror prefix for issue query reports.
pub const FILE_PREFIX: &str = "jira_issues";

pub const ISSUES_SHEET: &str = "Jira issues";
pub const DETAILS_SHEET: &str = "Report Details";

pub const ISSUE_COLUMNS: [&str; 10] = [
    "Issue number",
    "Issue type",
    "Project",
    "Summary",
    "Assignee",
    "Reporter",
    "Status",
    "Created (create date)",
    "Resolved (resolution date)",
    "Issue URL",
];

const GENERATED_BY: &str = "Jira Server Custom Evidence Collector";
const DETAILS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders the workbook. `generated_at` is local wall-clock time.
pub fn render(evidence: &IssueQueryEvidence, generated_at: NaiveDateTime) -> Result<EvidenceDocument, FormatError> {
    // Validate every row before touching the workbook.
    let rows = evidence
        .issues
        .iter()
        .enumerate()
        .map(|(i, issue)| issue_row(i, issue))
        .collect::<Result<Vec<_>, _>>()?;

    let header = Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Bottom)
        .set_pattern(FormatPattern::Gray125);
    let label = Format::new()
        .set_text_wrap()
        .set_align(FormatAlign::Bottom)
        .set_pattern(FormatPattern::Gray125);
    let body = Format::new().set_text_wrap().set_align(FormatAlign::Bottom);

    let mut workbook = Workbook::new();
    write_issues(workbook.add_worksheet(), &rows, &header, &body)?;
    write_details(workbook.add_worksheet(), &details(evidence, generated_at), &label, &body)?;
    let bytes = workbook.save_to_buffer()?;

    let stamp = generated_at.format("%Y%m%d%H%M%S").to_string();
    let record_id = RecordId::new(stamp).ok_or_else(|| FormatError::missing("generated_at"))?;
    Ok(EvidenceDocument::new(DocumentKind::Spreadsheet, FILE_PREFIX, record_id, bytes))
}

/// One `Jira issues` row, in [`ISSUE_COLUMNS`] order.
pub fn issue_row(index: usize, issue: &JiraIssue) -> Result<[String; 10], FormatError> {
    let field = |name: &str| format!("issues[{index}].{name}");
    let fields = required_ref(&issue.fields, &field("fields"))?;

    let named = |value: &Option<crate::JiraNamed>, name: &str| -> Result<String, FormatError> {
        let object = required_ref(value, &field(name))?;
        required(&object.name, &field(&format!("{name}.name"))).map(str::to_owned)
    };
    let person = |value: &Option<crate::JiraUser>, name: &str| -> Result<String, FormatError> {
        let object = required_ref(value, &field(name))?;
        required(&object.display_name, &field(&format!("{name}.displayName"))).map(str::to_owned)
    };
    let timestamp = |value: &Option<String>, name: &str| -> Result<String, FormatError> {
        let raw = required(value, &field(name))?;
        Ok(SourceTimestamp::parse_with_offset(&field(name), raw)?.to_sheet_cell())
    };

    Ok([
        required(&issue.key, &field("key"))?.to_owned(),
        named(&fields.issuetype, "fields.issuetype")?,
        named(&fields.project, "fields.project")?,
        required(&fields.summary, &field("fields.summary"))?.to_owned(),
        person(&fields.assignee, "fields.assignee")?,
        person(&fields.reporter, "fields.reporter")?,
        named(&fields.status, "fields.status")?,
        timestamp(&fields.created, "fields.created")?,
        timestamp(&fields.resolutiondate, "fields.resolutiondate")?,
        required(&issue.self_url, &field("self"))?.to_owned(),
    ])
}

/// Label/value pairs of the `Report Details` sheet.
pub fn details(evidence: &IssueQueryEvidence, generated_at: NaiveDateTime) -> [(&'static str, String); 6] {
    // Clamps to the earliest representable time instead of overflowing.
    let range_start = generated_at
        .checked_sub_signed(Duration::days(i64::from(evidence.date_range_days)))
        .unwrap_or(NaiveDateTime::MIN);
    [
        ("Generated by", GENERATED_BY.to_owned()),
        ("Generated on", generated_at.format(DETAILS_TIME_FORMAT).to_string()),
        ("Date range start", range_start.format(DETAILS_TIME_FORMAT).to_string()),
        ("Date range end", generated_at.format(DETAILS_TIME_FORMAT).to_string()),
        ("JQL", evidence.jql.clone()),
        ("Fields requested", evidence.fields_requested.clone()),
    ]
}

fn write_issues(sheet: &mut Worksheet, rows: &[[String; 10]], header: &Format, body: &Format) -> Result<(), FormatError> {
    sheet.set_name(ISSUES_SHEET)?;
    for (col, title) in (0u16..).zip(ISSUE_COLUMNS) {
        sheet.set_column_width(col, 30)?;
        sheet.write_string_with_format(0, col, title, header)?;
    }
    sheet.set_row_height(0, 50)?;

    for (row, cells) in (1u32..).zip(rows) {
        sheet.set_row_height(row, 50)?;
        for (col, cell) in (0u16..).zip(cells) {
            sheet.write_string_with_format(row, col, cell, body)?;
        }
    }
    Ok(())
}

fn write_details(
    sheet: &mut Worksheet,
    details: &[(&'static str, String)],
    label: &Format,
    body: &Format,
) -> Result<(), FormatError> {
    sheet.set_name(DETAILS_SHEET)?;
    sheet.set_column_width(0, 30)?;
    sheet.set_column_width(1, 100)?;
    for (row, (name, value)) in (0u32..).zip(details) {
        sheet.set_row_height(row, 30)?;
        sheet.write_string_with_format(row, 0, *name, label)?;
        sheet.write_string_with_format(row, 1, value, body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::{JiraFields, JiraNamed, JiraUser};

    fn named(name: &str) -> Option<JiraNamed> {
        Some(JiraNamed {
            name: Some(name.into()),
        })
    }

    fn person(name: &str) -> Option<JiraUser> {
        Some(JiraUser {
            display_name: Some(name.into()),
        })
    }

    fn resolved_issue(key: &str) -> JiraIssue {
        JiraIssue {
            self_url: Some(format!("https://jira.example.com/rest/api/2/issue/{key}")),
            key: Some(key.into()),
            fields: Some(JiraFields {
                summary: Some("Rotate credentials, staging".into()),
                issuetype: named("Task"),
                project: named("Operations"),
                status: named("Done"),
                assignee: person("Dana Scully"),
                reporter: person("Fox Mulder"),
                created: Some("2021-03-04T12:34:56.000+0000".into()),
                resolutiondate: Some("2021-03-05T08:00:00.000-0500".into()),
            }),
        }
    }

    fn evidence(issues: Vec<JiraIssue>) -> IssueQueryEvidence {
        IssueQueryEvidence {
            jql: "resolved >= -90d".into(),
            fields_requested: "issuetype, project, summary".into(),
            date_range_days: 90,
            issues,
        }
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap().and_hms_opt(14, 0, 5).unwrap()
    }

    #[test]
    fn issue_row_follows_column_order() {
        let row = issue_row(0, &resolved_issue("OPS-1")).unwrap();
        assert_eq!(
            row,
            [
                "OPS-1",
                "Task",
                "Operations",
                "Rotate credentials, staging",
                "Dana Scully",
                "Fox Mulder",
                "Done",
                "2021-03-04 12:34:56",
                "2021-03-05 08:00:00",
                "https://jira.example.com/rest/api/2/issue/OPS-1",
            ]
        );
    }

    #[test]
    fn details_cover_reporting_window() {
        let rows = details(&evidence(Vec::new()), generated_at());
        assert_eq!(rows[1], ("Generated on", "2021-06-01 14:00:05".to_owned()));
        assert_eq!(rows[2], ("Date range start", "2021-03-03 14:00:05".to_owned()));
        assert_eq!(rows[3], ("Date range end", "2021-06-01 14:00:05".to_owned()));
        assert_eq!(rows[4].1, "resolved >= -90d");
    }

    #[test]
    fn oversized_range_does_not_overflow() {
        let mut wide = evidence(Vec::new());
        wide.date_range_days = u32::MAX;

        let rows = details(&wide, generated_at());

        assert_eq!(rows[2].1, NaiveDateTime::MIN.format(DETAILS_TIME_FORMAT).to_string());
        assert_eq!(rows[3], ("Date range end", "2021-06-01 14:00:05".to_owned()));
    }

    #[test]
    fn renders_xlsx_package() {
        let document = render(&evidence(vec![resolved_issue("OPS-1"), resolved_issue("OPS-2")]), generated_at()).unwrap();

        assert_eq!(document.kind(), DocumentKind::Spreadsheet);
        assert_eq!(document.local_file_name(), "jira_issues-20210601140005.xlsx");
        assert_eq!(&document.bytes()[..2], b"PK");
    }

    #[test]
    fn empty_result_set_still_renders() {
        let document = render(&evidence(Vec::new()), generated_at()).unwrap();
        assert!(!document.bytes().is_empty());
    }

    #[test]
    fn unassigned_issue_fails_the_report() {
        let mut issue = resolved_issue("OPS-9");
        if let Some(fields) = issue.fields.as_mut() {
            fields.assignee = None;
        }

        let err = render(&evidence(vec![resolved_issue("OPS-1"), issue]), generated_at()).unwrap_err();

        assert!(matches!(err, FormatError::MissingField { ref field } if field == "issues[1].fields.assignee"));
    }

    #[test]
    fn malformed_resolution_date_fails_the_report() {
        let mut issue = resolved_issue("OPS-3");
        if let Some(fields) = issue.fields.as_mut() {
            fields.resolutiondate = Some("last tuesday".into());
        }

        let err = issue_row(0, &issue).unwrap_err();

        assert!(matches!(err, FormatError::InvalidTimestamp { .. }));
    }
}
