// Report schema: where every section lives and which attributes hold its
// values.
//
// The vendor layout drifts between report versions, so none of this is
// hardcoded in the extractors. The built-in default describes the layout
// observed in production exports; a TOML file can override any leaf of it.
use crate::access::NodePath;
use crate::error::SchemaError;
use crate::xml::ParseOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a section's repeating rows are found.
///
/// `path` leads from the report root to the repeating element. When
/// `detail` is set, each row's values are read from the first node at
/// that sub-path instead of the row itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSource {
    pub path: NodePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<NodePath>,
}

impl RowSource {
    pub fn new(path: &str) -> Self {
        RowSource {
            path: path.into(),
            detail: None,
        }
    }

    pub fn with_detail(path: &str, detail: &str) -> Self {
        RowSource {
            path: path.into(),
            detail: Some(detail.into()),
        }
    }
}

/// An attribute read from the first node at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrRef {
    pub path: NodePath,
    pub attr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineRule {
    pub total_clients: String,
    pub lives_covered: String,
}

/// Keyed distribution: category label to count and percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub key: String,
    pub count: String,
    pub percent: String,
    pub filter_sentinels: bool,
    /// Candidate layouts, tried in order.
    pub rows: Vec<RowSource>,
}

impl CategoryRule {
    fn new(rows: Vec<RowSource>, key: &str, count: &str, percent: &str) -> Self {
        CategoryRule {
            rows,
            key: key.to_string(),
            count: count.to_string(),
            percent: percent.to_string(),
            filter_sentinels: true,
        }
    }

    /// The common `table1_Optionskey` layout under `section`.
    fn option_table(section: &str, count: &str, percent: &str) -> Self {
        let rows = vec![RowSource::with_detail(
            &format!("{section}.Report.table1.table1_Optionskey_Collection.table1_Optionskey"),
            "Detail_Collection.Detail",
        )];
        CategoryRule::new(rows, "Optionskey", count, percent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseTypeRule {
    pub discriminator: String,
    pub eap_label: String,
    pub worklife_label: String,
    pub pd: String,
    pub ytd: String,
    pub rows: Vec<RowSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBreakdownRule {
    pub discriminator: String,
    pub eap_label: String,
    pub worklife_label: String,
    pub pd: String,
    pub ptd: String,
    pub yd: String,
    pub ytd: String,
    pub rows: Vec<RowSource>,
}

impl CaseBreakdownRule {
    fn new(section: &str) -> Self {
        CaseBreakdownRule {
            rows: vec![RowSource::with_detail(
                &format!("{section}.Report.Tablix3.Details_Collection.Details"),
                "Detail_Collection.Detail",
            )],
            discriminator: "Optionskey".into(),
            eap_label: "EAP".into(),
            worklife_label: "W/L".into(),
            pd: "PD_".into(),
            ptd: "PTD_".into(),
            yd: "YD_".into(),
            ytd: "YTD_".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationRule {
    pub node: NodePath,
    pub current: String,
    pub yearly: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRule {
    pub label: String,
    pub pd: String,
    pub ptd: String,
    pub yd: String,
    pub ytd: String,
    pub filter_sentinels: bool,
    pub rows: Vec<RowSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyRule {
    pub key: String,
    pub count: String,
    pub percentage: String,
    pub ytd: String,
    pub filter_sentinels: bool,
    pub rows: Vec<RowSource>,
}

/// Two-level presenting issues: main categories, each holding issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRule {
    /// Relative to a category row; every match is an issue.
    pub issues: NodePath,
    pub issue_label: String,
    /// Relative to an issue; where its numbers live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_detail: Option<NodePath>,
    pub count: String,
    pub percent: String,
    pub filter_sentinels: bool,
    /// Relative to a category row.
    pub category_label: AttrRef,
    pub categories: Vec<RowSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSchema {
    /// Required document element.
    pub root: String,
    /// Placeholder labels dropped from every filtering section.
    pub sentinels: Vec<String>,
    pub parser: ParseOptions,
    pub headline: HeadlineRule,
    pub case_types: CaseTypeRule,
    pub cases_opened: CaseBreakdownRule,
    pub cases_closed: CaseBreakdownRule,
    pub utilization_rate: UtilizationRule,
    pub gender: CategoryRule,
    pub division: CategoryRule,
    pub age: CategoryRule,
    pub referred_by: CategoryRule,
    pub work_status: CategoryRule,
    pub aware_eap: CategoryRule,
    pub prior_eap: CategoryRule,
    pub marital_status: CategoryRule,
    pub ethnicity: CategoryRule,
    pub education: EducationRule,
    pub urgency: UrgencyRule,
    pub presenting_issues: IssueRule,
}

impl Default for ReportSchema {
    fn default() -> Self {
        let referred_by = CategoryRule::new(
            vec![
                RowSource::new("referredby.Report.table1.Detail_Collection.Detail"),
                RowSource::new("referredby.Report.table1.Detail"),
                RowSource::new("referredby.Report.table1.Details"),
                RowSource::with_detail(
                    "referredby.Report.table1.table1_Optionskey_Collection.table1_Optionskey",
                    "Detail_Collection.Detail",
                ),
            ],
            "Optionskey",
            "YD_",
            "PTD_",
        );

        ReportSchema {
            root: "Report".into(),
            sentinels: vec!["Data Not Available".into()],
            parser: ParseOptions::default(),
            headline: HeadlineRule {
                total_clients: "Textbox19".into(),
                lives_covered: "Textbox30".into(),
            },
            case_types: CaseTypeRule {
                rows: vec![RowSource::new("GetCasesByType.Details12_Collection.Details12")],
                discriminator: "CaseType".into(),
                eap_label: "EAP".into(),
                worklife_label: "W/L".into(),
                pd: "PD2".into(),
                ytd: "YTD2".into(),
            },
            cases_opened: CaseBreakdownRule::new("CS_CasesOpened2"),
            cases_closed: CaseBreakdownRule::new("CasesClosed"),
            utilization_rate: UtilizationRule {
                node: "UtilRate.Report.Tablix1.Details_Collection.Details".into(),
                current: "UtilRate".into(),
                yearly: "YTDUtilRate".into(),
                description: "Description".into(),
            },
            gender: CategoryRule::option_table("CS_Gender", "PD_", "PTD_"),
            division: CategoryRule::new(
                vec![RowSource::new("Division.Report.table1.Detail_Collection.Detail")],
                "DivisionName",
                "YD_",
                "PTD_",
            ),
            age: CategoryRule::option_table("CS_Age3", "YD_", "PTD_"),
            referred_by,
            work_status: CategoryRule::option_table("WorkStatus", "YD_", "PTD_"),
            aware_eap: CategoryRule::option_table("AwareEAP", "PD_", "PTD_"),
            prior_eap: CategoryRule::option_table("PriorEAP", "YD_", "PTD_2"),
            marital_status: CategoryRule::option_table("MaritalStatus", "YD_", "PTD_"),
            ethnicity: CategoryRule::option_table("Ethnicity", "YD_", "PTD_"),
            education: EducationRule {
                rows: vec![RowSource::new("Education.Report.Tablix1.Details_Collection.Details")],
                label: "Optionskey".into(),
                pd: "PD_".into(),
                ptd: "PTD_".into(),
                yd: "Textbox14".into(),
                ytd: "Textbox15".into(),
                filter_sentinels: true,
            },
            urgency: UrgencyRule {
                rows: vec![RowSource::new("Urgency.Report.Tablix3.Details_Collection.Details")],
                key: "Optionskey1".into(),
                count: "PD_1".into(),
                percentage: "Textbox24".into(),
                ytd: "Textbox28".into(),
                filter_sentinels: false,
            },
            presenting_issues: IssueRule {
                categories: vec![RowSource::new(
                    "PresentingIssuePrimary.Report.Tablix1.MainCategory_Collection.MainCategory",
                )],
                category_label: AttrRef {
                    path: "Optionskey3".into(),
                    attr: "Optionskey3".into(),
                },
                issues: "Textbox14.Issue_Collection.Issue".into(),
                issue_label: "Optionskey4".into(),
                issue_detail: Some("Details1_Collection.Details1".into()),
                count: "YD_2".into(),
                percent: "PTD_4".into(),
                filter_sentinels: true,
            },
        }
    }
}

impl ReportSchema {
    /// Built-in schema with `overlay` merged on top.
    ///
    /// Tables merge key by key at any depth; any other value, arrays
    /// included, replaces the built-in one.
    pub fn from_toml_str(overlay: &str) -> Result<Self, SchemaError> {
        let mut base = toml::Value::try_from(ReportSchema::default())?;
        let overlay: toml::Table = toml::from_str(overlay)?;
        merge(&mut base, toml::Value::Table(overlay));
        Ok(base.try_into()?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema = Self::from_toml_str(&text)?;
        log::info!("Loaded report schema overrides from {}", path.display());
        Ok(schema)
    }

    /// The built-in schema as TOML, a starting point for override files.
    pub fn to_toml_string(&self) -> Result<String, SchemaError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
