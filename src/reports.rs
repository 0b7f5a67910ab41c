// Flattening of the model into display rows.
//
// Rows with a zero count are left out and the rest are sorted by count,
// highest first, which is how every dashboard table is shown.
use crate::types::{
    split_issue_key, CaseBreakdown, CaseBreakdownTableRow, DashboardModel, Distribution,
    DistributionRow, EducationRow, EducationTableRow, HeadlineRow, IssueRow, Urgency,
    UrgencyTableRow,
};
use crate::util::{format_int, format_number};
use indexmap::IndexMap;

pub fn headline_rows(model: &DashboardModel) -> Vec<HeadlineRow> {
    let mut rows = vec![HeadlineRow {
        metric: "Total Clients".to_string(),
        pd: String::new(),
        ytd: format_int(model.total_clients),
    }];
    if let Some(lives) = model.lives_covered {
        rows.push(HeadlineRow {
            metric: "Lives Covered".to_string(),
            pd: String::new(),
            ytd: format_int(lives),
        });
    }
    if let Some(types) = &model.case_types {
        rows.push(HeadlineRow {
            metric: "Total Cases".to_string(),
            pd: format_int(types.eap.pd.saturating_add(types.worklife.pd)),
            ytd: format_int(model.total_cases()),
        });
        rows.push(HeadlineRow {
            metric: "EAP Cases".to_string(),
            pd: format_int(types.eap.pd),
            ytd: format_int(types.eap.ytd),
        });
        rows.push(HeadlineRow {
            metric: "W/L Cases".to_string(),
            pd: format_int(types.worklife.pd),
            ytd: format_int(types.worklife.ytd),
        });
    }
    if let Some(rate) = &model.utilization_rate {
        rows.push(HeadlineRow {
            metric: "Utilization Rate".to_string(),
            pd: format!("{}%", format_number(rate.current, 2)),
            ytd: format!("{}%", format_number(rate.yearly, 2)),
        });
    }
    rows
}

pub fn distribution_rows(dist: &Distribution) -> Vec<DistributionRow> {
    let mut rows: Vec<DistributionRow> = dist
        .iter()
        .filter(|(_, stat)| stat.yd != 0)
        .map(|(label, stat)| DistributionRow {
            category: label.clone(),
            count: stat.yd,
            percentage: stat.ptd.clone(),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Presenting issues regrouped under their main category.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueGroup {
    pub category: String,
    pub total: i64,
    pub issues: Vec<DistributionRow>,
}

/// Split compound presenting-issue keys back into categories.
///
/// Categories whose issues add up to zero are dropped. Groups and the
/// issues inside them are sorted by count, highest first.
pub fn group_presenting_issues(dist: &Distribution) -> Vec<IssueGroup> {
    let mut groups: IndexMap<&str, Distribution> = IndexMap::new();
    for (key, stat) in dist {
        let (category, issue) = split_issue_key(key);
        groups
            .entry(category)
            .or_default()
            .insert(issue.to_string(), stat.clone());
    }

    let mut out: Vec<IssueGroup> = groups
        .into_iter()
        .map(|(category, issues)| IssueGroup {
            category: category.to_string(),
            total: issues.values().fold(0, |acc: i64, s| acc.saturating_add(s.yd)),
            issues: distribution_rows(&issues),
        })
        .filter(|g| g.total > 0)
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total));
    out
}

pub fn issue_rows(groups: &[IssueGroup]) -> Vec<IssueRow> {
    groups
        .iter()
        .flat_map(|g| {
            g.issues.iter().map(|i| IssueRow {
                category: g.category.clone(),
                issue: i.category.clone(),
                count: i.count,
                percentage: i.percentage.clone(),
            })
        })
        .collect()
}

pub fn education_rows(rows: &[EducationRow]) -> Vec<EducationTableRow> {
    let mut out: Vec<EducationTableRow> = rows
        .iter()
        .filter(|r| r.yd != 0)
        .map(|r| EducationTableRow {
            label: r.label.clone(),
            pd: r.pd,
            ptd: r.ptd.clone(),
            yd: r.yd,
            ytd: r.ytd.clone(),
        })
        .collect();
    out.sort_by(|a, b| b.yd.cmp(&a.yd));
    out
}

pub fn urgency_rows(urgency: &Urgency) -> Vec<UrgencyTableRow> {
    let mut out: Vec<UrgencyTableRow> = urgency
        .details()
        .iter()
        .filter(|r| r.count != 0)
        .map(|r| UrgencyTableRow {
            key: r.key.clone(),
            count: r.count,
            percentage: r.percentage.clone(),
            ytd: r.ytd.clone(),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

pub fn case_breakdown_rows(breakdown: &CaseBreakdown) -> Vec<CaseBreakdownTableRow> {
    [("EAP", &breakdown.eap), ("W/L", &breakdown.worklife)]
        .into_iter()
        .map(|(case_type, row)| CaseBreakdownTableRow {
            case_type: case_type.to_string(),
            pd: row.pd,
            ptd: row.ptd.clone(),
            yd: row.yd,
            ytd: row.ytd.clone(),
        })
        .collect()
}
