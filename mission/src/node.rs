//! Mission-tree nodes.
//!
//! A node is a project, a mission or a step. Which one, together with the
//! period type, selects a [`MissionKind`] and with it the regeneration
//! default. Impact statistics bubble up exactly once, when a child is
//! attached to its parent.

use chrono::{DateTime, Utc};
use tracing::error;

use crate::error::MissionError;
use crate::types::*;

/// Concrete variant of a node, resolved from (level, period type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionKind {
    /// Root of a period's missions
    Project(MissionPeriodType),
    /// Mission inside a project
    Mission(MissionPeriodType),
    /// Leaf step; the period type is optional at this level
    Step(Option<MissionPeriodType>),
}

impl MissionKind {
    /// Resolve the variant for a level and period type.
    ///
    /// Projects and missions need a period type, steps do not.
    pub fn resolve(
        level: MissionLevel,
        period: Option<MissionPeriodType>,
    ) -> Result<Self, MissionError> {
        match (level, period) {
            (MissionLevel::Project, Some(period)) => Ok(Self::Project(period)),
            (MissionLevel::Mission, Some(period)) => Ok(Self::Mission(period)),
            (MissionLevel::Step, period) => Ok(Self::Step(period)),
            (MissionLevel::Project | MissionLevel::Mission, None) => {
                Err(MissionError::InvalidVariant { level, period })
            }
        }
    }

    /// Structural level of this variant.
    pub fn level(&self) -> MissionLevel {
        match self {
            Self::Project(_) => MissionLevel::Project,
            Self::Mission(_) => MissionLevel::Mission,
            Self::Step(_) => MissionLevel::Step,
        }
    }

    /// Period type, if this variant carries one.
    pub fn period_type(&self) -> Option<MissionPeriodType> {
        match self {
            Self::Project(period) | Self::Mission(period) => Some(*period),
            Self::Step(period) => *period,
        }
    }

    /// Regeneration budget a freshly created node of this variant gets.
    pub fn default_regeneration_left(&self) -> i64 {
        match self {
            Self::Project(MissionPeriodType::Weekly) => NOT_REGENERABLE,
            Self::Project(MissionPeriodType::Ongoing) => UNLIMITED_REGENERATION,
            Self::Mission(MissionPeriodType::Weekly) => WEEKLY_MISSION_REGENERATION_MAX,
            Self::Mission(MissionPeriodType::Ongoing) => NOT_REGENERABLE,
            Self::Step(_) => NOT_REGENERABLE,
        }
    }
}

/// Caller-supplied fields for a new node.
#[derive(Debug, Clone, Default)]
pub struct MissionFields {
    pub title: String,
    pub description: String,
    pub status: MissionStatus,
    pub eco_points: i64,
    pub co2_in_kg: i64,
    pub deadline: Option<DateTime<Utc>>,
    pub style_id: Option<String>,
    pub event_id: Option<String>,
}

impl MissionFields {
    /// Fields with just a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the impact values assigned directly to the node.
    pub fn with_impact(mut self, eco_points: i64, co2_in_kg: i64) -> Self {
        self.eco_points = eco_points;
        self.co2_in_kg = co2_in_kg;
        self
    }

    /// Set the deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A child slot of a node.
///
/// Freshly generated trees hold inline nodes. Trees rebuilt from the store
/// hold id references until the store resolves them.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionChild {
    Node(MissionNode),
    Ref(String),
}

impl MissionChild {
    /// Id of the child, if known.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Node(node) => node.id.as_deref(),
            Self::Ref(id) => Some(id),
        }
    }

    /// The inline node, if loaded.
    pub fn as_node(&self) -> Option<&MissionNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Ref(_) => None,
        }
    }

    /// The inline node, mutably.
    pub fn as_node_mut(&mut self) -> Option<&mut MissionNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Ref(_) => None,
        }
    }
}

/// A project, mission or step.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionNode {
    /// Storage id, assigned on persistence
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: MissionStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub style_id: Option<String>,
    pub event_id: Option<String>,
    kind: MissionKind,
    steps: Vec<MissionChild>,
    eco_points: i64,
    co2_in_kg: i64,
    regeneration_left: i64,
    created_timestamp: DateTime<Utc>,
}

impl MissionNode {
    /// Create a node, applying its variant's regeneration default.
    pub fn create(
        level: MissionLevel,
        period: Option<MissionPeriodType>,
        fields: MissionFields,
    ) -> Result<Self, MissionError> {
        let kind = MissionKind::resolve(level, period)?;
        Ok(Self::from_parts(
            kind,
            fields,
            kind.default_regeneration_left(),
            Utc::now(),
        ))
    }

    pub(crate) fn from_parts(
        kind: MissionKind,
        fields: MissionFields,
        regeneration_left: i64,
        created_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            title: fields.title,
            description: fields.description,
            status: fields.status,
            deadline: fields.deadline,
            style_id: fields.style_id,
            event_id: fields.event_id,
            kind,
            steps: Vec::new(),
            eco_points: fields.eco_points,
            co2_in_kg: fields.co2_in_kg,
            regeneration_left,
            created_timestamp,
        }
    }

    pub fn kind(&self) -> MissionKind {
        self.kind
    }

    pub fn level(&self) -> MissionLevel {
        self.kind.level()
    }

    pub fn period_type(&self) -> Option<MissionPeriodType> {
        self.kind.period_type()
    }

    pub fn eco_points(&self) -> i64 {
        self.eco_points
    }

    pub fn co2_in_kg(&self) -> i64 {
        self.co2_in_kg
    }

    pub fn regeneration_left(&self) -> i64 {
        self.regeneration_left
    }

    /// Whether this node may still be regenerated.
    pub fn is_regenerable(&self) -> bool {
        self.regeneration_left > 0
    }

    pub fn created_timestamp(&self) -> DateTime<Utc> {
        self.created_timestamp
    }

    /// Children in order.
    pub fn steps(&self) -> &[MissionChild] {
        &self.steps
    }

    /// Children in order, mutably. The slots can be swapped between
    /// reference and inline form but not added or removed.
    pub fn steps_mut(&mut self) -> &mut [MissionChild] {
        &mut self.steps
    }

    /// Inline children only.
    pub fn step_nodes(&self) -> impl Iterator<Item = &MissionNode> {
        self.steps.iter().filter_map(MissionChild::as_node)
    }

    /// Attach a child and fold its impact into this node.
    pub fn attach_child(&mut self, child: MissionNode) -> Result<(), MissionError> {
        if self.level().child_level() != Some(child.level()) {
            error!(
                parent = %self.level(),
                child = %child.level(),
                "Rejected child of the wrong level"
            );
            return Err(MissionError::InvalidChildType {
                parent: self.level(),
                child: child.level(),
            });
        }

        if let (Some(parent), Some(child_period)) = (self.period_type(), child.period_type()) {
            if parent != child_period {
                return Err(MissionError::PeriodMismatch {
                    parent,
                    child: child_period,
                });
            }
        }

        self.eco_points += child.eco_points;
        self.co2_in_kg += child.co2_in_kg;
        self.steps.push(MissionChild::Node(child));
        Ok(())
    }

    /// Attach several children in order.
    pub fn attach_children(
        &mut self,
        children: impl IntoIterator<Item = MissionNode>,
    ) -> Result<(), MissionError> {
        for child in children {
            self.attach_child(child)?;
        }
        Ok(())
    }

    pub(crate) fn push_reference(&mut self, id: String) {
        self.steps.push(MissionChild::Ref(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly_mission(title: &str, eco: i64, co2: i64) -> MissionNode {
        MissionNode::create(
            MissionLevel::Mission,
            Some(MissionPeriodType::Weekly),
            MissionFields::titled(title).with_impact(eco, co2),
        )
        .unwrap()
    }

    #[test]
    fn test_regeneration_defaults() {
        let cases = [
            (MissionLevel::Project, Some(MissionPeriodType::Weekly), NOT_REGENERABLE),
            (MissionLevel::Project, Some(MissionPeriodType::Ongoing), UNLIMITED_REGENERATION),
            (MissionLevel::Mission, Some(MissionPeriodType::Weekly), WEEKLY_MISSION_REGENERATION_MAX),
            (MissionLevel::Mission, Some(MissionPeriodType::Ongoing), NOT_REGENERABLE),
            (MissionLevel::Step, None, NOT_REGENERABLE),
            (MissionLevel::Step, Some(MissionPeriodType::Weekly), NOT_REGENERABLE),
            (MissionLevel::Step, Some(MissionPeriodType::Ongoing), NOT_REGENERABLE),
        ];

        for (level, period, expected) in cases {
            let node = MissionNode::create(level, period, MissionFields::titled("t")).unwrap();
            assert_eq!(node.regeneration_left(), expected, "{level} {period:?}");
            assert_eq!(node.level(), level);
            assert_eq!(node.status, MissionStatus::NotStarted);
            assert!(node.id.is_none());
        }
    }

    #[test]
    fn test_invalid_variant() {
        for level in [MissionLevel::Project, MissionLevel::Mission] {
            let err = MissionNode::create(level, None, MissionFields::titled("t")).unwrap_err();
            assert_eq!(err, MissionError::InvalidVariant { level, period: None });
        }
    }

    #[test]
    fn test_attach_accumulates_once() {
        let mut project = MissionNode::create(
            MissionLevel::Project,
            Some(MissionPeriodType::Weekly),
            MissionFields::titled("Week 3").with_impact(1, 2),
        )
        .unwrap();

        project
            .attach_children([weekly_mission("Mission 1", 10, 20), weekly_mission("Mission 2", 5, 15)])
            .unwrap();

        assert_eq!(project.eco_points(), 16);
        assert_eq!(project.co2_in_kg(), 37);
        assert_eq!(project.steps().len(), 2);
        assert_eq!(project.step_nodes().next().unwrap().title, "Mission 1");
    }

    #[test]
    fn test_attach_order_independent() {
        let impacts = [(3, 7), (11, 0), (0, 5), (42, 9)];

        let build = |order: &[usize]| {
            let mut project = MissionNode::create(
                MissionLevel::Project,
                Some(MissionPeriodType::Weekly),
                MissionFields::titled("p"),
            )
            .unwrap();
            for &i in order {
                let (eco, co2) = impacts[i];
                project.attach_child(weekly_mission("m", eco, co2)).unwrap();
            }
            (project.eco_points(), project.co2_in_kg())
        };

        let forward = build(&[0, 1, 2, 3]);
        assert_eq!(forward, (56, 21));
        assert_eq!(build(&[3, 2, 1, 0]), forward);
        assert_eq!(build(&[2, 0, 3, 1]), forward);
    }

    #[test]
    fn test_attach_rejects_wrong_level() {
        let mut mission = weekly_mission("m", 0, 0);
        let project = MissionNode::create(
            MissionLevel::Project,
            Some(MissionPeriodType::Weekly),
            MissionFields::titled("p"),
        )
        .unwrap();

        let err = mission.attach_child(project).unwrap_err();
        assert_eq!(
            err,
            MissionError::InvalidChildType {
                parent: MissionLevel::Mission,
                child: MissionLevel::Project,
            }
        );

        let mut step =
            MissionNode::create(MissionLevel::Step, None, MissionFields::titled("s")).unwrap();
        let other = step.clone();
        assert!(step.attach_child(other).is_err());
        assert_eq!(mission.eco_points(), 0);
    }

    #[test]
    fn test_attach_rejects_period_mismatch() {
        let mut project = MissionNode::create(
            MissionLevel::Project,
            Some(MissionPeriodType::Ongoing),
            MissionFields::titled("p"),
        )
        .unwrap();

        let err = project
            .attach_child(weekly_mission("m", 1, 1))
            .unwrap_err();
        assert!(matches!(err, MissionError::PeriodMismatch { .. }));
        assert!(project.steps().is_empty());
    }
}
