//! Read-and-render pages: opportunities, academic resources, lost & found,
//! plus the bug report form.

use crate::app::App;
use crate::db::models::{
    AcademicResource, LostFoundItem, LostFoundStatus, NewBugReport, NewLostFoundItem, Opportunity,
    ResourceKind,
};
use crate::error::{ClientError, ClientResult};
use crate::remote::OpportunityQuery;
use crate::state::Modal;

#[derive(Debug, Clone, PartialEq)]
pub enum ListView<T> {
    Loading,
    Items(Vec<T>),
    Empty,
    Failed(String),
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        ListView::Loading
    }
}

impl<T> ListView<T> {
    fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            ListView::Empty
        } else {
            ListView::Items(items)
        }
    }
}

pub type OpportunitiesView = ListView<Opportunity>;
pub type LostFoundView = ListView<LostFoundItem>;

pub struct Subject {
    pub name: &'static str,
    pub abbr: &'static str,
}

/// First-year subjects, by division.
pub const FIRST_YEAR_DIVISIONS: &[(&str, &[Subject])] = &[
    (
        "A–J",
        &[
            Subject { name: "Engineering Chemistry", abbr: "EC" },
            Subject { name: "Digital Logic Design", abbr: "DLD" },
            Subject { name: "Programming for Problem Solving", abbr: "PPS" },
            Subject { name: "Universal Human Values", abbr: "UHV" },
            Subject { name: "Integral Calculus & Differential Equations", abbr: "IC&DE" },
        ],
    ),
    (
        "K–T",
        &[
            Subject { name: "Indian Knowledge System", abbr: "IKS" },
            Subject { name: "Engineering Physics", abbr: "EP" },
            Subject { name: "Foundation of Data Analytics", abbr: "FDA" },
            Subject { name: "Basic Workshop Technology", abbr: "BWT" },
            Subject { name: "English for Engineers", abbr: "EE" },
        ],
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectView {
    pub name: &'static str,
    pub abbr: &'static str,
    pub resources: Vec<AcademicResource>,
}

impl SubjectView {
    /// Resources under one of the notes / question bank / papers tabs.
    pub fn tab(&self, kind: ResourceKind) -> Vec<&AcademicResource> {
        self.resources.iter().filter(|r| r.kind == kind).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DivisionView {
    pub name: &'static str,
    pub subjects: Vec<SubjectView>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum AcademicsView {
    #[default]
    Loading,
    /// No content for this year yet; contributions welcome.
    Unavailable { year: u8 },
    Divisions(Vec<DivisionView>),
}

pub fn group_by_division(resources: &[AcademicResource]) -> Vec<DivisionView> {
    FIRST_YEAR_DIVISIONS
        .iter()
        .map(|&(name, subjects)| DivisionView {
            name,
            subjects: subjects
                .iter()
                .map(|s| SubjectView {
                    name: s.name,
                    abbr: s.abbr,
                    resources: resources
                        .iter()
                        .filter(|r| r.subject == s.abbr)
                        .cloned()
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl App {
    pub async fn load_opportunities(&self, query: OpportunityQuery) -> ClientResult<()> {
        let token = {
            let mut state = self.state();
            state.listings.opportunity_filter = query.clone();
            state.listings.opportunities.begin(ListView::Loading)
        };
        match self.data.select_opportunities(&query).await {
            Ok(items) => {
                self.state()
                    .listings
                    .opportunities
                    .apply(token, ListView::from_items(items));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load opportunities: {}", e);
                self.state().listings.opportunities.apply(
                    token,
                    ListView::Failed("Failed to load opportunities.".to_string()),
                );
                Err(e.into())
            }
        }
    }

    /// Resources for `year`. Only first year has content; fetched once per year.
    pub async fn load_academics(&self, year: u8) -> ClientResult<()> {
        let (token, cached) = {
            let mut state = self.state();
            state.listings.year = year;
            let token = state.listings.academics.begin(AcademicsView::Loading);
            (token, state.listings.resource_cache.get(&year).cloned())
        };
        if year != 1 {
            self.state()
                .listings
                .academics
                .apply(token, AcademicsView::Unavailable { year });
            return Ok(());
        }

        let (resources, result): (Vec<AcademicResource>, ClientResult<()>) = match cached {
            Some(resources) => (resources, Ok(())),
            None => match self.data.select_resources(year).await {
                Ok(resources) => {
                    self.state()
                        .listings
                        .resource_cache
                        .insert(year, resources.clone());
                    (resources, Ok(()))
                }
                Err(e) => {
                    tracing::warn!("Failed to load resources for year {}: {}", year, e);
                    (Vec::new(), Err(e.into()))
                }
            },
        };

        let divisions = group_by_division(&resources);
        self.state()
            .listings
            .academics
            .apply(token, AcademicsView::Divisions(divisions));
        result
    }

    pub async fn load_lost_found(&self, tab: LostFoundStatus) -> ClientResult<()> {
        let token = {
            let mut state = self.state();
            state.listings.lost_found_tab = tab;
            state.listings.lost_found.begin(ListView::Loading)
        };
        let limit = self.config.limits.lost_found_limit;
        match self.data.select_lost_found(tab, limit).await {
            Ok(items) => {
                self.state()
                    .listings
                    .lost_found
                    .apply(token, ListView::from_items(items));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load {} items: {}", tab, e);
                self.state().listings.lost_found.apply(
                    token,
                    ListView::Failed(format!("Failed to load {tab} items.")),
                );
                Err(e.into())
            }
        }
    }

    pub fn open_lost_item_form(&self) -> ClientResult<()> {
        self.require_auth()?;
        self.state().modal = Some(Modal::LostItem);
        Ok(())
    }

    pub async fn submit_lost_item(
        &self,
        status: LostFoundStatus,
        name: &str,
        location: &str,
        contact: &str,
    ) -> ClientResult<()> {
        let user_id = self.require_auth()?;
        let name = non_empty(name).ok_or_else(|| ClientError::validation("Enter item description"))?;

        let item = NewLostFoundItem {
            user_id,
            name,
            location: non_empty(location),
            contact: non_empty(contact),
            status,
        };
        self.data
            .insert_lost_found(&item)
            .await
            .map_err(ClientError::persist)?;

        {
            let mut state = self.state();
            state.modal = None;
            state.push_notice("Item reported!");
        }
        self.load_lost_found(status).await
    }

    pub fn open_bug_report(&self) {
        self.state().modal = Some(Modal::BugReport);
    }

    /// Anyone may report a bug; the reporter is attached when signed in.
    pub async fn submit_bug_report(&self, description: &str) -> ClientResult<()> {
        let description =
            non_empty(description).ok_or_else(|| ClientError::validation("Describe the bug first"))?;
        let report = NewBugReport {
            user_id: self.current_user_id(),
            description,
        };
        self.data
            .insert_bug_report(&report)
            .await
            .map_err(ClientError::persist)?;

        let mut state = self.state();
        state.modal = None;
        state.push_notice("Bug reported! Thank you 🙏");
        Ok(())
    }
}
