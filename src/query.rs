// Alert query builder
// This file turns alert filter selectors into the Opsgenie search query
// language used by the alert count endpoint

use std::fmt;

/// Alert priorities, in the order breakdowns are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
    P5,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::P1,
        Priority::P2,
        Priority::P3,
        Priority::P4,
        Priority::P5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
            Priority::P5 => "P5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertStatus {
    Open,
    Closed,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 2] = [AlertStatus::Open, AlertStatus::Closed];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Open => "open",
            AlertStatus::Closed => "closed",
        }
    }
}

/// One point in the alert label space. Unset or empty fields do not
/// constrain the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub team: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl AlertFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Render the filter as an Opsgenie query. Clauses are emitted in the
    /// order team, status, priority and joined with `AND`; an empty string
    /// matches every alert.
    pub fn to_query(&self) -> String {
        self.to_string()
    }

    fn clauses(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("teams", self.team.as_deref()),
            ("status", self.status.as_deref()),
            ("priority", self.priority.as_deref()),
        ]
        .into_iter()
        .filter_map(|(keyword, value)| value.filter(|v| !v.is_empty()).map(|v| (keyword, v)))
    }
}

impl fmt::Display for AlertFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (keyword, value)) in self.clauses().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{keyword}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(AlertFilter::new().to_query(), "");
        let blank = AlertFilter::new().team("").status("").priority("");
        assert_eq!(blank.to_query(), "");
    }

    #[test]
    fn single_field_uses_its_own_keyword() {
        assert_eq!(AlertFilter::new().status("open").to_query(), "status: open");
        assert_eq!(
            AlertFilter::new().team("Everyone").to_query(),
            "teams: Everyone"
        );
        assert_eq!(AlertFilter::new().priority("P2").to_query(), "priority: P2");
    }

    #[test]
    fn clauses_follow_team_status_priority_order() {
        let filter = AlertFilter::new()
            .priority("P3")
            .status("closed")
            .team("Everyone");
        assert_eq!(
            filter.to_query(),
            "teams: Everyone AND status: closed AND priority: P3"
        );
    }

    #[test]
    fn status_clause_carries_status_value() {
        let filter = AlertFilter::new().team("ops").status("open");
        assert_eq!(filter.to_query(), "teams: ops AND status: open");

        let filter = AlertFilter::new().status("closed").priority("P1");
        assert_eq!(filter.to_query(), "status: closed AND priority: P1");
    }

    #[test]
    fn empty_fields_are_skipped_between_clauses() {
        let filter = AlertFilter::new().team("ops").status("").priority("P5");
        assert_eq!(filter.to_query(), "teams: ops AND priority: P5");
    }

    #[test]
    fn enumerations_are_fixed() {
        let priorities: Vec<_> = Priority::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(priorities, ["P1", "P2", "P3", "P4", "P5"]);
        let statuses: Vec<_> = AlertStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(statuses, ["open", "closed"]);
    }
}
