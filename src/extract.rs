// Section extractors and model assembly.
//
// Every extractor is a pure function of the parsed tree and its schema
// rule. A missing section yields `None`; a missing or unreadable leaf
// yields the default count or percentage. Nothing in here fails except
// the root check in `build_model`.
use crate::access::{resolve, resolve_all, resolve_any, Lookup};
use crate::error::ExtractError;
use crate::schema::{
    CaseBreakdownRule, CaseTypeRule, CategoryRule, EducationRule, IssueRule, ReportSchema,
    RowSource, UrgencyRule, UtilizationRule,
};
use crate::types::{
    issue_key, CaseBreakdown, CaseBreakdownRow, CaseCount, CaseTypes, CategoryStat,
    DashboardModel, Distribution, EducationRow, Urgency, UrgencyRow, UtilizationRate,
};
use crate::util::{count_or_zero, is_sentinel, percent_or_default, percent_value};
use crate::xml::{self, XmlNode};

/// Parse report text and build its model.
pub fn extract_dashboard(xml: &str, schema: &ReportSchema) -> Result<DashboardModel, ExtractError> {
    let root = xml::parse_with(xml, &schema.parser)?;
    build_model(&root, schema)
}

/// Run every section extractor against one parsed report.
pub fn build_model(root: &XmlNode, schema: &ReportSchema) -> Result<DashboardModel, ExtractError> {
    if root.name != schema.root {
        return Err(ExtractError::Structure {
            expected: schema.root.clone(),
            found: root.name.clone(),
        });
    }
    let sentinels = schema.sentinels.as_slice();

    Ok(DashboardModel {
        total_clients: count_or_zero(root.attr(&schema.headline.total_clients)),
        lives_covered: root
            .attr(&schema.headline.lives_covered)
            .map(|v| count_or_zero(Some(v))),
        case_types: extract_case_types(root, &schema.case_types),
        utilization_rate: extract_utilization(root, &schema.utilization_rate),
        gender: extract_distribution(root, &schema.gender, sentinels, "gender"),
        division: extract_distribution(root, &schema.division, sentinels, "division"),
        age: extract_distribution(root, &schema.age, sentinels, "age"),
        referred_by: extract_distribution(root, &schema.referred_by, sentinels, "referredBy"),
        work_status: extract_distribution(root, &schema.work_status, sentinels, "workStatus"),
        presenting_issues: extract_presenting_issues(root, &schema.presenting_issues, sentinels),
        marital_status: extract_distribution(
            root,
            &schema.marital_status,
            sentinels,
            "maritalStatus",
        ),
        ethnicity: extract_distribution(root, &schema.ethnicity, sentinels, "ethnicity"),
        aware_eap: extract_distribution(root, &schema.aware_eap, sentinels, "awareEAP"),
        prior_eap: extract_distribution(root, &schema.prior_eap, sentinels, "priorEAP"),
        education: extract_education(root, &schema.education, sentinels),
        urgency: extract_urgency(root, &schema.urgency, sentinels),
        cases_opened: extract_case_breakdown(root, &schema.cases_opened, "casesOpened"),
        cases_closed: extract_case_breakdown(root, &schema.cases_closed, "casesClosed"),
    })
}

/// Rows of a section, each narrowed to the node holding its values.
///
/// Candidate layouts are tried in order. A row whose detail sub-path is
/// missing is skipped.
fn section_rows<'a>(root: &'a XmlNode, sources: &[RowSource], section: &str) -> Option<Vec<&'a XmlNode>> {
    let Some((idx, rows)) = resolve_any(root, sources.iter().map(|s| &s.path)) else {
        log::debug!("{section}: section not present");
        return None;
    };
    let detail = sources.get(idx).and_then(|s| s.detail.as_ref());
    if idx > 0 {
        log::debug!("{section}: using alternative layout {}", sources[idx].path);
    }

    let narrowed = rows
        .into_iter()
        .filter_map(|row| match detail {
            Some(path) => {
                let found = resolve(row, path);
                if found.is_absent() {
                    log::debug!("{section}: <{}> row has no {path}", row.name);
                }
                found.node()
            }
            None => Some(row),
        })
        .collect();
    Some(narrowed)
}

/// Trimmed, non-empty label attribute.
fn label_of<'a>(node: &'a XmlNode, attr: &str) -> Option<&'a str> {
    node.attr(attr).map(str::trim).filter(|l| !l.is_empty())
}

/// Label to keep, or `None` when the row is unlabeled or a sentinel.
fn keep_label<'a>(
    node: &'a XmlNode,
    attr: &str,
    filter: bool,
    sentinels: &[String],
    section: &str,
) -> Option<&'a str> {
    let Some(label) = label_of(node, attr) else {
        log::debug!("{section}: skipping row without {attr}");
        return None;
    };
    if filter && is_sentinel(label, sentinels) {
        log::debug!("{section}: dropping placeholder row {label:?}");
        return None;
    }
    Some(label)
}

pub fn extract_distribution(
    root: &XmlNode,
    rule: &CategoryRule,
    sentinels: &[String],
    section: &str,
) -> Option<Distribution> {
    let rows = section_rows(root, &rule.rows, section)?;
    let mut out = Distribution::new();
    for row in rows {
        let Some(label) = keep_label(row, &rule.key, rule.filter_sentinels, sentinels, section)
        else {
            continue;
        };
        // a repeated label keeps its first position and its last values
        out.insert(
            label.to_string(),
            CategoryStat {
                yd: count_or_zero(row.attr(&rule.count)),
                ptd: percent_or_default(row.attr(&rule.percent)),
            },
        );
    }
    log::debug!("{section}: {} categories", out.len());
    Some(out)
}

pub fn extract_presenting_issues(
    root: &XmlNode,
    rule: &IssueRule,
    sentinels: &[String],
) -> Option<Distribution> {
    const SECTION: &str = "presentingIssues";
    let categories = section_rows(root, &rule.categories, SECTION)?;
    let filter = rule.filter_sentinels;

    let mut out = Distribution::new();
    for category in categories {
        let Some(label_node) = resolve(category, &rule.category_label.path).node() else {
            log::debug!("{SECTION}: category without {}", rule.category_label.path);
            continue;
        };
        let Some(category_label) =
            keep_label(label_node, &rule.category_label.attr, filter, sentinels, SECTION)
        else {
            continue;
        };

        for issue in resolve_all(category, &rule.issues).unwrap_or_default() {
            let Some(issue_label) = keep_label(issue, &rule.issue_label, filter, sentinels, SECTION)
            else {
                continue;
            };
            let detail = match &rule.issue_detail {
                Some(path) => Lookup::Found(issue).then(path),
                None => Lookup::Found(issue),
            };
            out.insert(
                issue_key(category_label, issue_label),
                CategoryStat {
                    yd: count_or_zero(detail.attr(&rule.count)),
                    ptd: percent_or_default(detail.attr(&rule.percent)),
                },
            );
        }
    }
    log::debug!("{SECTION}: {} issues", out.len());
    Some(out)
}

/// Pick the EAP and work/life rows.
///
/// Rows are matched on the discriminator attribute. Reports that carry no
/// discriminator at all list EAP first and work/life second.
fn pick_case_rows<'a>(
    rows: &[&'a XmlNode],
    discriminator: &str,
    eap_label: &str,
    worklife_label: &str,
) -> (Option<&'a XmlNode>, Option<&'a XmlNode>) {
    let tagged = rows.iter().any(|r| r.attr(discriminator).is_some());
    if !tagged {
        return (rows.first().copied(), rows.get(1).copied());
    }
    let find = |wanted: &str| {
        rows.iter()
            .copied()
            .find(|r| label_of(r, discriminator).is_some_and(|l| l.eq_ignore_ascii_case(wanted)))
    };
    (find(eap_label), find(worklife_label))
}

pub fn extract_case_types(root: &XmlNode, rule: &CaseTypeRule) -> Option<CaseTypes> {
    let rows = section_rows(root, &rule.rows, "caseTypes")?;
    let (eap, worklife) =
        pick_case_rows(&rows, &rule.discriminator, &rule.eap_label, &rule.worklife_label);
    let count = |row: Option<&XmlNode>| CaseCount {
        pd: count_or_zero(row.and_then(|r| r.attr(&rule.pd))),
        ytd: count_or_zero(row.and_then(|r| r.attr(&rule.ytd))),
    };
    Some(CaseTypes {
        eap: count(eap),
        worklife: count(worklife),
    })
}

pub fn extract_case_breakdown(
    root: &XmlNode,
    rule: &CaseBreakdownRule,
    section: &str,
) -> Option<CaseBreakdown> {
    let rows = section_rows(root, &rule.rows, section)?;
    let (eap, worklife) =
        pick_case_rows(&rows, &rule.discriminator, &rule.eap_label, &rule.worklife_label);
    let breakdown = |row: Option<&XmlNode>| {
        let attr = |name: &str| row.and_then(|r| r.attr(name));
        CaseBreakdownRow {
            pd: count_or_zero(attr(&rule.pd)),
            ptd: percent_or_default(attr(&rule.ptd)),
            yd: count_or_zero(attr(&rule.yd)),
            ytd: percent_or_default(attr(&rule.ytd)),
        }
    };
    Some(CaseBreakdown {
        eap: breakdown(eap),
        worklife: breakdown(worklife),
    })
}

pub fn extract_utilization(root: &XmlNode, rule: &UtilizationRule) -> Option<UtilizationRate> {
    let Some(node) = resolve(root, &rule.node).node() else {
        log::debug!("utilizationRate: section not present");
        return None;
    };
    Some(UtilizationRate {
        current: percent_value(node.attr(&rule.current)),
        yearly: percent_value(node.attr(&rule.yearly)),
        description: node
            .attr(&rule.description)
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
    })
}

pub fn extract_education(
    root: &XmlNode,
    rule: &EducationRule,
    sentinels: &[String],
) -> Option<Vec<EducationRow>> {
    const SECTION: &str = "education";
    let rows = section_rows(root, &rule.rows, SECTION)?;
    let out: Vec<EducationRow> = rows
        .into_iter()
        .filter_map(|row| {
            let label = keep_label(row, &rule.label, rule.filter_sentinels, sentinels, SECTION)?;
            Some(EducationRow {
                label: label.to_string(),
                pd: count_or_zero(row.attr(&rule.pd)),
                ptd: percent_or_default(row.attr(&rule.ptd)),
                yd: count_or_zero(row.attr(&rule.yd)),
                ytd: percent_or_default(row.attr(&rule.ytd)),
            })
        })
        .collect();
    log::debug!("{SECTION}: {} rows", out.len());
    Some(out)
}

pub fn extract_urgency(root: &XmlNode, rule: &UrgencyRule, sentinels: &[String]) -> Option<Urgency> {
    const SECTION: &str = "urgency";
    let rows = section_rows(root, &rule.rows, SECTION)?;
    let details: Vec<UrgencyRow> = rows
        .into_iter()
        .filter_map(|row| {
            let key = keep_label(row, &rule.key, rule.filter_sentinels, sentinels, SECTION)?;
            Some(UrgencyRow {
                key: key.to_string(),
                count: count_or_zero(row.attr(&rule.count)),
                percentage: percent_or_default(row.attr(&rule.percentage)),
                ytd: percent_or_default(row.attr(&rule.ytd)),
            })
        })
        .collect();
    log::debug!("{SECTION}: {} rows", details.len());
    Some(Urgency::new(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use pretty_assertions::assert_eq;

    fn extract(xml: &str) -> DashboardModel {
        extract_dashboard(xml, &ReportSchema::default()).unwrap()
    }

    fn gender_section(details: &str) -> String {
        format!(
            "<Report><CS_Gender><Report><table1><table1_Optionskey_Collection>{details}\
             </table1_Optionskey_Collection></table1></Report></CS_Gender></Report>"
        )
    }

    fn option(label: &str, count: &str, pct: &str) -> String {
        format!(
            r#"<table1_Optionskey><Detail_Collection><Detail Optionskey="{label}" PD_="{count}" PTD_="{pct}"/></Detail_Collection></table1_Optionskey>"#
        )
    }

    #[test]
    fn empty_report_yields_empty_model() {
        let model = extract("<Report></Report>");
        assert_eq!(model, DashboardModel::default());
        assert_eq!(model.total_clients, 0);
        assert_eq!(model.total_cases(), 0);
    }

    #[test]
    fn malformed_xml_is_a_syntax_error() {
        let err = extract_dashboard("<not-xml", &ReportSchema::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Syntax(_)));
        let err = extract_dashboard("", &ReportSchema::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Syntax(ParseError::Empty)));
    }

    #[test]
    fn wrong_root_is_a_structure_error() {
        let err = extract_dashboard("<Summary/>", &ReportSchema::default()).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Structure { ref expected, ref found } if expected == "Report" && found == "Summary"
        ));
    }

    #[test]
    fn reads_headline_counts() {
        let model = extract(r#"<Report Textbox19="1,250" Textbox30="n/a"/>"#);
        assert_eq!(model.total_clients, 1250);
        assert_eq!(model.lives_covered, Some(0));
    }

    #[test]
    fn extracts_category_distribution() {
        let xml = gender_section(&[
            option("Female", "30", "60%"),
            option("Male", "18", "36%"),
            option("Other", "2", "4%"),
        ]
        .concat());
        let gender = extract(&xml).gender.unwrap();
        assert_eq!(gender.keys().collect::<Vec<_>>(), ["Female", "Male", "Other"]);
        assert_eq!(gender["Male"], CategoryStat { yd: 18, ptd: "36%".into() });
    }

    #[test]
    fn single_and_multiple_rows_extract_the_same_way() {
        let one = extract(&gender_section(&option("Female", "30", "60%"))).gender.unwrap();
        let two = extract(&gender_section(
            &[option("Female", "30", "60%"), option("Male", "18", "36%")].concat(),
        ))
        .gender
        .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(two.len(), 2);
        assert_eq!(one["Female"], two["Female"]);
    }

    #[test]
    fn drops_sentinel_rows_in_any_case() {
        let xml = gender_section(
            &[
                option("Female", "30", "60%"),
                option("DATA NOT AVAILABLE", "5", "10%"),
                option("data not available", "1", "2%"),
            ]
            .concat(),
        );
        let gender = extract(&xml).gender.unwrap();
        assert_eq!(gender.keys().collect::<Vec<_>>(), ["Female"]);
    }

    #[test]
    fn bad_leaves_take_defaults() {
        let xml = gender_section(
            &[
                option("Female", "lots", "about half"),
                r#"<table1_Optionskey><Detail_Collection><Detail Optionskey="Male"/></Detail_Collection></table1_Optionskey>"#.to_string(),
            ]
            .concat(),
        );
        let gender = extract(&xml).gender.unwrap();
        assert_eq!(gender["Female"], CategoryStat { yd: 0, ptd: "0%".into() });
        assert_eq!(gender["Male"], CategoryStat { yd: 0, ptd: "0%".into() });
    }

    #[test]
    fn present_section_without_rows_is_absent() {
        let model = extract("<Report><CS_Gender><Report><table1/></Report></CS_Gender></Report>");
        assert_eq!(model.gender, None);
    }

    #[test]
    fn referred_by_accepts_alternative_layouts() {
        let nested = r#"<Report><referredby><Report><table1><Detail_Collection>
                <Detail Optionskey="Self" YD_="9" PTD_="90%"/>
            </Detail_Collection></table1></Report></referredby></Report>"#;
        let flat = r#"<Report><referredby><Report><table1>
                <Details Optionskey="Self" YD_="9" PTD_="90%"/>
            </table1></Report></referredby></Report>"#;
        let a = extract(nested).referred_by.unwrap();
        let b = extract(flat).referred_by.unwrap();
        assert_eq!(a, b);
        assert_eq!(a["Self"].yd, 9);
    }

    #[test]
    fn presenting_issues_use_compound_keys() {
        let xml = r#"<Report><PresentingIssuePrimary><Report><Tablix1><MainCategory_Collection>
              <MainCategory>
                <Optionskey3 Optionskey3="Family"/>
                <Textbox14><Issue_Collection>
                  <Issue Optionskey4="Stress"><Details1_Collection><Details1 YD_2="4" PTD_4="20%"/></Details1_Collection></Issue>
                  <Issue Optionskey4="Data Not Available"><Details1_Collection><Details1 YD_2="1" PTD_4="5%"/></Details1_Collection></Issue>
                </Issue_Collection></Textbox14>
              </MainCategory>
              <MainCategory>
                <Optionskey3 Optionskey3="Work"/>
                <Textbox14><Issue_Collection>
                  <Issue Optionskey4="Conflict"/>
                </Issue_Collection></Textbox14>
              </MainCategory>
            </MainCategory_Collection></Tablix1></Report></PresentingIssuePrimary></Report>"#;
        let issues = extract(xml).presenting_issues.unwrap();
        assert_eq!(
            issues.keys().collect::<Vec<_>>(),
            ["Family - Stress", "Work - Conflict"]
        );
        assert_eq!(issues["Family - Stress"], CategoryStat { yd: 4, ptd: "20%".into() });
        assert_eq!(issues["Work - Conflict"], CategoryStat { yd: 0, ptd: "0%".into() });
    }

    #[test]
    fn case_types_match_discriminator_and_total() {
        let xml = r#"<Report><GetCasesByType><Details12_Collection>
                <Details12 CaseType="W/L" PD2="2" YTD2="11"/>
                <Details12 CaseType="eap" PD2="5" YTD2="40"/>
            </Details12_Collection></GetCasesByType></Report>"#;
        let model = extract(xml);
        let types = model.case_types.clone().unwrap();
        assert_eq!(types.eap, CaseCount { pd: 5, ytd: 40 });
        assert_eq!(types.worklife, CaseCount { pd: 2, ytd: 11 });
        assert_eq!(model.total_cases(), 51);
    }

    #[test]
    fn case_types_fall_back_to_position() {
        let xml = r#"<Report><GetCasesByType><Details12_Collection>
                <Details12 PD2="5" YTD2="40"/>
                <Details12 PD2="2" YTD2="11"/>
            </Details12_Collection></GetCasesByType></Report>"#;
        let types = extract(xml).case_types.unwrap();
        assert_eq!(types.eap.ytd, 40);
        assert_eq!(types.worklife.ytd, 11);
    }

    #[test]
    fn case_types_missing_row_defaults_to_zero() {
        let xml = r#"<Report><GetCasesByType><Details12_Collection>
                <Details12 CaseType="EAP" PD2="5" YTD2="40"/>
            </Details12_Collection></GetCasesByType></Report>"#;
        let types = extract(xml).case_types.unwrap();
        assert_eq!(types.worklife, CaseCount::default());
    }

    #[test]
    fn cases_closed_breakdown() {
        let xml = r#"<Report><CasesClosed><Report><Tablix3><Details_Collection>
                <Details><Detail_Collection><Detail Optionskey="EAP" PD_="7" PTD_="70%" YD_="30" YTD_="75%"/></Detail_Collection></Details>
                <Details><Detail_Collection><Detail Optionskey="W/L" PD_="3" PTD_="30%" YD_="10" YTD_="25%"/></Detail_Collection></Details>
            </Details_Collection></Tablix3></Report></CasesClosed></Report>"#;
        let model = extract(xml);
        let closed = model.cases_closed.unwrap();
        assert_eq!(
            closed.eap,
            CaseBreakdownRow { pd: 7, ptd: "70%".into(), yd: 30, ytd: "75%".into() }
        );
        assert_eq!(closed.worklife.yd, 10);
        assert_eq!(model.cases_opened, None);
    }

    #[test]
    fn utilization_is_scalar() {
        let xml = r#"<Report><UtilRate><Report><Tablix1><Details_Collection>
                <Details UtilRate="4.5%" YTDUtilRate="bogus" Description=" Annualized rate "/>
                <Details UtilRate="99%"/>
            </Details_Collection></Tablix1></Report></UtilRate></Report>"#;
        let rate = extract(xml).utilization_rate.unwrap();
        assert_eq!(rate.current, 4.5);
        assert_eq!(rate.yearly, 0.0);
        assert_eq!(rate.description, "Annualized rate");
    }

    #[test]
    fn education_is_an_ordered_sequence() {
        let xml = r#"<Report><Education><Report><Tablix1><Details_Collection>
                <Details Optionskey="High School" PD_="3" PTD_="30%" Textbox14="12" Textbox15="40%"/>
                <Details Optionskey="Data Not Available" PD_="1"/>
                <Details Optionskey="Bachelor" PD_="7" PTD_="70%" Textbox14="18" Textbox15="60%"/>
            </Details_Collection></Tablix1></Report></Education></Report>"#;
        let education = extract(xml).education.unwrap();
        assert_eq!(education.len(), 2);
        assert_eq!(education[0].label, "High School");
        assert_eq!(education[1].yd, 18);
        assert_eq!(education[1].ytd, "60%");
    }

    #[test]
    fn urgency_keeps_rows_near_raw() {
        let xml = r#"<Report><Urgency><Report><Tablix3><Details_Collection>
                <Details Optionskey1="Routine" PD_1="8" Textbox24="80%" Textbox28="31"/>
                <Details Optionskey1="Data Not Available" PD_1="2" Textbox24="20%"/>
            </Details_Collection></Tablix3></Report></Urgency></Report>"#;
        let urgency = extract(xml).urgency.unwrap();
        assert_eq!(urgency.details().len(), 2);
        assert_eq!(
            urgency.details()[0],
            UrgencyRow { key: "Routine".into(), count: 8, percentage: "80%".into(), ytd: "31".into() }
        );
        assert_eq!(urgency.details()[1].ytd, "0%");
    }

    #[test]
    fn schema_controls_attribute_names() {
        let mut schema = ReportSchema::default();
        schema.gender.percent = "PTD_7".into();
        let xml = gender_section(
            r#"<table1_Optionskey><Detail_Collection><Detail Optionskey="Female" PD_="3" PTD_="1%" PTD_7="9%"/></Detail_Collection></table1_Optionskey>"#,
        );
        let gender = extract_dashboard(&xml, &schema).unwrap().gender.unwrap();
        assert_eq!(gender["Female"].ptd, "9%");
    }

    #[test]
    fn extraction_is_idempotent() {
        let xml = gender_section(&option("Female", "30", "60%"));
        assert_eq!(extract(&xml), extract(&xml));
    }
}
