use indexmap::IndexMap;
use serde::Serialize;
use tabled::Tabled;

/// Separator joining a presenting-issue main category and issue into one
/// key. Presentation splits on the same string.
pub const ISSUE_KEY_SEPARATOR: &str = " - ";

pub fn issue_key(category: &str, issue: &str) -> String {
    format!("{category}{ISSUE_KEY_SEPARATOR}{issue}")
}

/// Inverse of [`issue_key`]. Splits on the first separator only.
pub fn split_issue_key(key: &str) -> (&str, &str) {
    key.split_once(ISSUE_KEY_SEPARATOR).unwrap_or((key, ""))
}

/// One bucket of a category distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub yd: i64,
    pub ptd: String,
}

/// Category label to stat, in report order.
pub type Distribution = IndexMap<String, CategoryStat>;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CaseCount {
    pub pd: i64,
    pub ytd: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CaseTypes {
    pub eap: CaseCount,
    pub worklife: CaseCount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseBreakdownRow {
    pub pd: i64,
    pub ptd: String,
    pub yd: i64,
    pub ytd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseBreakdown {
    pub eap: CaseBreakdownRow,
    pub worklife: CaseBreakdownRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationRate {
    pub current: f64,
    pub yearly: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationRow {
    pub label: String,
    pub pd: i64,
    pub ptd: String,
    pub yd: i64,
    pub ytd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrgencyRow {
    pub key: String,
    pub count: i64,
    pub percentage: String,
    pub ytd: String,
}

/// Urgency keeps the nesting of its report section:
/// `Report.Tablix3.Details_Collection.Details`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Urgency {
    #[serde(rename = "Report")]
    pub report: UrgencyReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrgencyReport {
    #[serde(rename = "Tablix3")]
    pub tablix3: UrgencyTablix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrgencyTablix {
    #[serde(rename = "Details_Collection")]
    pub details_collection: UrgencyDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrgencyDetails {
    #[serde(rename = "Details")]
    pub details: Vec<UrgencyRow>,
}

impl Urgency {
    pub fn new(details: Vec<UrgencyRow>) -> Self {
        Urgency {
            report: UrgencyReport {
                tablix3: UrgencyTablix {
                    details_collection: UrgencyDetails { details },
                },
            },
        }
    }

    pub fn details(&self) -> &[UrgencyRow] {
        &self.report.tablix3.details_collection.details
    }
}

/// Everything one report file yields.
///
/// Optional fields are `None` when their report section is missing.
/// `total_cases` is never stored; see [`DashboardModel::total_cases`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardModel {
    pub total_clients: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lives_covered: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_types: Option<CaseTypes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization_rate: Option<UtilizationRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_status: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presenting_issues: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<Distribution>,
    #[serde(rename = "awareEAP", skip_serializing_if = "Option::is_none")]
    pub aware_eap: Option<Distribution>,
    #[serde(rename = "priorEAP", skip_serializing_if = "Option::is_none")]
    pub prior_eap: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<EducationRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cases_opened: Option<CaseBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cases_closed: Option<CaseBreakdown>,
}

impl DashboardModel {
    /// EAP plus work/life year-to-date cases, recomputed on every call.
    /// Saturates at `i64::MAX`.
    pub fn total_cases(&self) -> i64 {
        self.case_types
            .as_ref()
            .map_or(0, |c| c.eap.ytd.saturating_add(c.worklife.ytd))
    }

    /// Names of the optional sections that were not in the report.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        let present = [
            ("livesCovered", self.lives_covered.is_some()),
            ("caseTypes", self.case_types.is_some()),
            ("utilizationRate", self.utilization_rate.is_some()),
            ("gender", self.gender.is_some()),
            ("division", self.division.is_some()),
            ("age", self.age.is_some()),
            ("referredBy", self.referred_by.is_some()),
            ("workStatus", self.work_status.is_some()),
            ("presentingIssues", self.presenting_issues.is_some()),
            ("maritalStatus", self.marital_status.is_some()),
            ("ethnicity", self.ethnicity.is_some()),
            ("awareEAP", self.aware_eap.is_some()),
            ("priorEAP", self.prior_eap.is_some()),
            ("education", self.education.is_some()),
            ("urgency", self.urgency.is_some()),
            ("casesOpened", self.cases_opened.is_some()),
            ("casesClosed", self.cases_closed.is_some()),
        ];
        present
            .into_iter()
            .filter(|(_, found)| !found)
            .map(|(name, _)| name)
            .collect()
    }

    /// Category distributions by their model field name.
    pub fn distributions(&self) -> Vec<(&'static str, &Distribution)> {
        [
            ("gender", &self.gender),
            ("division", &self.division),
            ("age", &self.age),
            ("referredBy", &self.referred_by),
            ("workStatus", &self.work_status),
            ("maritalStatus", &self.marital_status),
            ("ethnicity", &self.ethnicity),
            ("awareEAP", &self.aware_eap),
            ("priorEAP", &self.prior_eap),
        ]
        .into_iter()
        .filter_map(|(name, d)| d.as_ref().map(|d| (name, d)))
        .collect()
    }
}

/// What gets written to `dashboard.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardExport<'a> {
    pub generated_at: String,
    pub source: String,
    pub total_cases: i64,
    #[serde(flatten)]
    pub model: &'a DashboardModel,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HeadlineRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "PD")]
    #[tabled(rename = "PD")]
    pub pd: String,
    #[serde(rename = "YTD")]
    #[tabled(rename = "YTD")]
    pub ytd: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DistributionRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: i64,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage")]
    pub percentage: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct IssueRow {
    #[serde(rename = "MainCategory")]
    #[tabled(rename = "MainCategory")]
    pub category: String,
    #[serde(rename = "Issue")]
    #[tabled(rename = "Issue")]
    pub issue: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: i64,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage")]
    pub percentage: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct EducationTableRow {
    #[serde(rename = "Education")]
    #[tabled(rename = "Education")]
    pub label: String,
    #[serde(rename = "PD")]
    #[tabled(rename = "PD")]
    pub pd: i64,
    #[serde(rename = "PTD")]
    #[tabled(rename = "PTD")]
    pub ptd: String,
    #[serde(rename = "YD")]
    #[tabled(rename = "YD")]
    pub yd: i64,
    #[serde(rename = "YTD")]
    #[tabled(rename = "YTD")]
    pub ytd: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct UrgencyTableRow {
    #[serde(rename = "UrgencyLevel")]
    #[tabled(rename = "UrgencyLevel")]
    pub key: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: i64,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage")]
    pub percentage: String,
    #[serde(rename = "YearToDate")]
    #[tabled(rename = "YearToDate")]
    pub ytd: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CaseBreakdownTableRow {
    #[serde(rename = "CaseType")]
    #[tabled(rename = "CaseType")]
    pub case_type: String,
    #[serde(rename = "PD")]
    #[tabled(rename = "PD")]
    pub pd: i64,
    #[serde(rename = "PTD")]
    #[tabled(rename = "PTD")]
    pub ptd: String,
    #[serde(rename = "YD")]
    #[tabled(rename = "YD")]
    pub yd: i64,
    #[serde(rename = "YTD")]
    #[tabled(rename = "YTD")]
    pub ytd: String,
}
