//! Persistable form of a node.
//!
//! Children are stored by id, enumerations as their plain string values.
//! Reading goes the other way in two passes: the mapping is first read into
//! a [`MissionRecord`] of plain strings, then the strings are resolved into
//! typed values so unknown members surface as
//! [`MissionError::UnknownEnumValue`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::error::MissionError;
use crate::node::{MissionFields, MissionKind, MissionNode};
use crate::types::*;

/// Plain-value document for a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: String,
    #[serde(rename = "type", default)]
    pub period_type: Option<String>,
    /// Older documents spell the period key `periodType`; read only when
    /// `type` is absent
    #[serde(rename = "periodType", default, skip_serializing_if = "Option::is_none")]
    pub legacy_period_type: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    /// Child ids in order
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub eco_points: i64,
    #[serde(alias = "CO2InKg", default)]
    pub co2_in_kg: i64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub style_id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
    /// Absent means the variant default
    #[serde(default)]
    pub regeneration_left: Option<i64>,
    /// Absent means now
    #[serde(default)]
    pub created_timestamp: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    MissionStatus::default().as_str().to_string()
}

impl MissionNode {
    /// Build the plain-value record of this node.
    ///
    /// Every child must already carry an id.
    pub fn to_record(&self) -> Result<MissionRecord, MissionError> {
        let steps = self
            .steps()
            .iter()
            .map(|child| {
                child.id().map(str::to_string).ok_or_else(|| MissionError::MissingChildId {
                    title: child
                        .as_node()
                        .map(|n| n.title.clone())
                        .unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MissionRecord {
            title: self.title.clone(),
            description: self.description.clone(),
            level: self.level().as_str().to_string(),
            period_type: self.period_type().map(|p| p.as_str().to_string()),
            legacy_period_type: None,
            status: self.status.as_str().to_string(),
            steps,
            eco_points: self.eco_points(),
            co2_in_kg: self.co2_in_kg(),
            deadline: self.deadline,
            style_id: self.style_id.clone(),
            event_id: self.event_id.clone(),
            regeneration_left: Some(self.regeneration_left()),
            created_timestamp: Some(self.created_timestamp()),
        })
    }

    /// Mapping suitable for the document store. The node's own id is the
    /// document key and is not included.
    pub fn to_persistable_form(&self) -> Result<Map<String, Value>, MissionError> {
        let record = self.to_record()?;
        match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(MissionError::InvalidMapping(format!(
                "expected an object, got {other}"
            ))),
            Err(e) => Err(MissionError::InvalidMapping(e.to_string())),
        }
    }

    /// Rebuild a node from its record. Children come back as id references
    /// and the stored statistics are taken as-is.
    pub fn from_record(record: MissionRecord) -> Result<Self, MissionError> {
        let level: MissionLevel = record.level.parse()?;
        if level.child_level().is_none() && !record.steps.is_empty() {
            return Err(MissionError::InvalidChildType {
                parent: level,
                child: MissionLevel::Step,
            });
        }

        let period = record
            .period_type
            .as_deref()
            .or(record.legacy_period_type.as_deref())
            .map(str::parse::<MissionPeriodType>)
            .transpose()?;
        let status: MissionStatus = record.status.parse()?;
        let kind = MissionKind::resolve(level, period)?;

        let fields = MissionFields {
            title: record.title,
            description: record.description,
            status,
            eco_points: record.eco_points,
            co2_in_kg: record.co2_in_kg,
            deadline: record.deadline,
            style_id: record.style_id,
            event_id: record.event_id,
        };

        let mut node = MissionNode::from_parts(
            kind,
            fields,
            record
                .regeneration_left
                .unwrap_or_else(|| kind.default_regeneration_left()),
            record.created_timestamp.unwrap_or_else(Utc::now),
        );
        for id in record.steps {
            node.push_reference(id);
        }
        Ok(node)
    }

    /// Rebuild a node from a stored mapping.
    pub fn from_mapping(mapping: Map<String, Value>) -> Result<Self, MissionError> {
        let record: MissionRecord = serde_json::from_value(Value::Object(mapping))
            .map_err(|e| MissionError::InvalidMapping(e.to_string()))?;
        Self::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MissionChild;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn persisted_mission() -> MissionNode {
        let mut mission = MissionNode::create(
            MissionLevel::Mission,
            Some(MissionPeriodType::Weekly),
            MissionFields::titled("Bike to class")
                .with_description("Swap the bus for a bike")
                .with_impact(4, 2),
        )
        .unwrap();
        mission.style_id = Some("style-1".to_string());

        for (i, title) in ["Check tires", "Plan route"].iter().enumerate() {
            let mut step = MissionNode::create(
                MissionLevel::Step,
                None,
                MissionFields::titled(*title).with_impact(1, 3),
            )
            .unwrap();
            step.id = Some(format!("step-{i}"));
            mission.attach_child(step).unwrap();
        }
        mission.id = Some("mission-1".to_string());
        mission
    }

    #[test]
    fn test_persistable_form_uses_plain_values() {
        let map = persisted_mission().to_persistable_form().unwrap();

        assert_eq!(map["level"], json!("mission"));
        assert_eq!(map["type"], json!("weekly"));
        assert_eq!(map["status"], json!("not started"));
        assert_eq!(map["steps"], json!(["step-0", "step-1"]));
        assert_eq!(map["ecoPoints"], json!(6));
        assert_eq!(map["co2InKg"], json!(8));
        assert_eq!(map["regenerationLeft"], json!(3));
        assert!(!map.contains_key("id"));
    }

    #[test]
    fn test_persistable_form_requires_child_ids() {
        let mut mission = MissionNode::create(
            MissionLevel::Mission,
            Some(MissionPeriodType::Ongoing),
            MissionFields::titled("m"),
        )
        .unwrap();
        mission
            .attach_child(
                MissionNode::create(MissionLevel::Step, None, MissionFields::titled("unsaved"))
                    .unwrap(),
            )
            .unwrap();

        let err = mission.to_persistable_form().unwrap_err();
        assert_eq!(
            err,
            MissionError::MissingChildId {
                title: "unsaved".to_string()
            }
        );
    }

    #[test]
    fn test_round_trip_keeps_scalar_fields() {
        let original = persisted_mission();
        let restored =
            MissionNode::from_mapping(original.to_persistable_form().unwrap()).unwrap();

        assert_eq!(restored.to_record().unwrap(), original.to_record().unwrap());
        assert_eq!(restored.kind(), original.kind());
        assert_eq!(restored.created_timestamp(), original.created_timestamp());
        assert_eq!(restored.eco_points(), 6);
        assert_eq!(
            restored.steps(),
            &[
                MissionChild::Ref("step-0".to_string()),
                MissionChild::Ref("step-1".to_string())
            ]
        );
        assert!(restored.id.is_none());
    }

    #[test]
    fn test_from_mapping_defaults() {
        let node = MissionNode::from_mapping(object(json!({
            "title": "Plant a tree",
            "level": "project",
            "periodType": "ongoing",
        })))
        .unwrap();

        assert_eq!(node.kind(), MissionKind::Project(MissionPeriodType::Ongoing));
        assert_eq!(node.regeneration_left(), UNLIMITED_REGENERATION);
        assert_eq!(node.status, MissionStatus::NotStarted);
        assert_eq!(node.description, "");
    }

    #[test]
    fn test_from_mapping_unknown_values() {
        let err = MissionNode::from_mapping(object(json!({
            "title": "t",
            "level": "epic",
            "type": "weekly",
        })))
        .unwrap_err();
        assert!(matches!(err, MissionError::UnknownEnumValue { field: "level", .. }));

        let err = MissionNode::from_mapping(object(json!({
            "title": "t",
            "level": "mission",
            "type": "weekly",
            "status": "NOT_STARTED",
        })))
        .unwrap_err();
        assert!(matches!(err, MissionError::UnknownEnumValue { field: "status", .. }));
    }

    #[test]
    fn test_from_mapping_missing_period() {
        let err = MissionNode::from_mapping(object(json!({
            "title": "t",
            "level": "mission",
        })))
        .unwrap_err();
        assert!(matches!(err, MissionError::InvalidVariant { .. }));
    }

    #[test]
    fn test_from_mapping_rejects_step_with_children() {
        let err = MissionNode::from_mapping(object(json!({
            "title": "t",
            "level": "step",
            "steps": ["x", "y"],
        })))
        .unwrap_err();
        assert_eq!(
            err,
            MissionError::InvalidChildType {
                parent: MissionLevel::Step,
                child: MissionLevel::Step,
            }
        );
    }

    #[test]
    fn test_from_mapping_prefers_type_over_period_type() {
        let node = MissionNode::from_mapping(object(json!({
            "title": "t",
            "level": "mission",
            "type": "weekly",
            "periodType": "ongoing",
        })))
        .unwrap();
        assert_eq!(node.period_type(), Some(MissionPeriodType::Weekly));

        let map = node.to_persistable_form().unwrap();
        assert_eq!(map["type"], json!("weekly"));
        assert!(!map.contains_key("periodType"));
    }

    #[test]
    fn test_from_mapping_accepts_legacy_co2_key() {
        let node = MissionNode::from_mapping(object(json!({
            "title": "t",
            "level": "step",
            "CO2InKg": 12,
        })))
        .unwrap();
        assert_eq!(node.co2_in_kg(), 12);
    }
}
