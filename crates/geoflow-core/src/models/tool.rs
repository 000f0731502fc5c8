use serde::{Deserialize, Serialize};

use super::dataset::DatasetKind;
use super::job::{ParamValue, Parameters};
use super::tier::Tier;
use crate::error::{GeoflowError, Result};

/// Declared shape of a single tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterKind {
    /// Numeric value within inclusive bounds
    Slider { default: f64, min: f64, max: f64 },
    /// One of a fixed set of options
    Select { default: String, options: Vec<String> },
    /// Free text; `json` requires the text to be a JSON document
    Text { default: String, json: bool },
}

impl ParameterKind {
    pub fn default_value(&self) -> ParamValue {
        match self {
            ParameterKind::Slider { default, .. } => ParamValue::Number(*default),
            ParameterKind::Select { default, .. } | ParameterKind::Text { default, .. } => {
                ParamValue::Text(default.clone())
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterKind::Slider { .. } => "slider",
            ParameterKind::Select { .. } => "select",
            ParameterKind::Text { .. } => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub label: String,
    /// Required parameters must be supplied; optional ones fall back to the default
    pub required: bool,
    pub kind: ParameterKind,
}

impl ParameterSpec {
    pub fn slider(name: &str, label: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: false,
            kind: ParameterKind::Slider { default, min, max },
        }
    }

    pub fn select(name: &str, label: &str, default: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: false,
            kind: ParameterKind::Select {
                default: default.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        }
    }

    pub fn json_text(name: &str, label: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            required: false,
            kind: ParameterKind::Text {
                default: default.to_string(),
                json: true,
            },
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Check a supplied value against this parameter's constraints
    pub fn check(&self, value: &ParamValue) -> Result<()> {
        self.resolve(value).map(|_| ())
    }

    /// Coerce a supplied value to this parameter's kind, then check it.
    ///
    /// Values typed loosely on the command line are read by schema: a number
    /// given for a select or text parameter is taken as its text, and numeric
    /// text given for a slider is taken as a number.
    pub fn resolve(&self, value: &ParamValue) -> Result<ParamValue> {
        let value = match (&self.kind, value) {
            (ParameterKind::Select { .. } | ParameterKind::Text { .. }, ParamValue::Number(n)) => {
                ParamValue::Text(n.to_string())
            }
            (ParameterKind::Slider { .. }, ParamValue::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) => ParamValue::Number(n),
                Err(_) => value.clone(),
            },
            _ => value.clone(),
        };

        match (&self.kind, &value) {
            (ParameterKind::Slider { min, max, .. }, ParamValue::Number(n)) => {
                if n.is_nan() || *n < *min || *n > *max {
                    return Err(GeoflowError::validation(
                        &self.name,
                        format!("{} is outside [{}, {}]", n, min, max),
                    ));
                }
            }
            (ParameterKind::Select { options, .. }, ParamValue::Text(s)) => {
                if !options.iter().any(|o| o == s) {
                    return Err(GeoflowError::validation(
                        &self.name,
                        format!("'{}' is not one of {}", s, options.join(", ")),
                    ));
                }
            }
            (ParameterKind::Text { json, .. }, ParamValue::Text(s)) => {
                if *json {
                    serde_json::from_str::<serde_json::Value>(s).map_err(|e| {
                        GeoflowError::validation(&self.name, format!("invalid JSON: {}", e))
                    })?;
                }
            }
            (kind, other) => {
                return Err(GeoflowError::validation(
                    &self.name,
                    format!("expected a {} value, got '{}'", kind.type_name(), other),
                ))
            }
        }
        Ok(value)
    }
}

/// An analysis operation offered by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub accepted_kinds: Vec<DatasetKind>,
    pub tier: Tier,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn accepts(&self, kind: DatasetKind) -> bool {
        self.accepted_kinds.contains(&kind)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Validate supplied parameters against the schema.
    ///
    /// Unknown keys and missing required keys are rejected. Returns the full
    /// parameter set with defaults filled in for omitted optional parameters.
    pub fn validate_parameters(&self, supplied: &Parameters) -> Result<Parameters> {
        if let Some(unknown) = supplied.keys().find(|k| self.parameter(k).is_none()) {
            return Err(GeoflowError::validation(
                unknown,
                format!("unknown parameter for {}", self.id),
            ));
        }

        let mut resolved = Parameters::new();
        for spec in &self.parameters {
            match supplied.get(&spec.name) {
                Some(value) => {
                    resolved.insert(spec.name.clone(), spec.resolve(value)?);
                }
                None if spec.required => {
                    return Err(GeoflowError::validation(
                        &spec.name,
                        "required parameter is missing",
                    ));
                }
                None => {
                    resolved.insert(spec.name.clone(), spec.kind.default_value());
                }
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ToolDescriptor {
        ToolDescriptor {
            id: "ndvi_analysis".to_string(),
            name: "NDVI Analysis".to_string(),
            category: "Vegetation Analysis".to_string(),
            description: String::new(),
            accepted_kinds: vec![DatasetKind::Raster],
            tier: Tier::Free,
            parameters: vec![
                ParameterSpec::select(
                    "band_combination",
                    "Band Combination",
                    "nir_red",
                    &["nir_red", "custom"],
                ),
                ParameterSpec::slider("threshold", "Vegetation Threshold", 0.3, 0.1, 0.8)
                    .required(),
            ],
        }
    }

    fn params(pairs: &[(&str, ParamValue)]) -> Parameters {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_defaults_filled_for_optional() {
        let resolved = tool()
            .validate_parameters(&params(&[("threshold", ParamValue::Number(0.3))]))
            .unwrap();
        assert_eq!(resolved["band_combination"], ParamValue::Text("nir_red".to_string()));
        assert_eq!(resolved["threshold"], ParamValue::Number(0.3));
    }

    #[test]
    fn test_missing_required() {
        let err = tool().validate_parameters(&Parameters::new()).unwrap_err();
        assert!(matches!(err, GeoflowError::Validation { ref field, .. } if field == "threshold"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = tool()
            .validate_parameters(&params(&[
                ("threshold", ParamValue::Number(0.3)),
                ("bogus", ParamValue::Number(1.0)),
            ]))
            .unwrap_err();
        assert!(matches!(err, GeoflowError::Validation { ref field, .. } if field == "bogus"));
    }

    #[test]
    fn test_slider_bounds_inclusive() {
        let tool = tool();
        let threshold = |n: f64| params(&[("threshold", ParamValue::Number(n))]);
        assert!(tool.validate_parameters(&threshold(0.1)).is_ok());
        assert!(tool.validate_parameters(&threshold(0.8)).is_ok());
        assert!(tool.validate_parameters(&threshold(0.81)).is_err());
        assert!(tool.validate_parameters(&threshold(f64::NAN)).is_err());
    }

    #[test]
    fn test_type_mismatch_and_select_options() {
        let tool = tool();
        assert!(tool
            .validate_parameters(&params(&[("threshold", ParamValue::Text("high".to_string()))]))
            .is_err());
        assert!(tool
            .validate_parameters(&params(&[
                ("threshold", ParamValue::Number(0.3)),
                ("band_combination", ParamValue::Text("swir".to_string())),
            ]))
            .is_err());
    }

    #[test]
    fn test_json_text() {
        let spec = ParameterSpec::json_text("criteria_weights", "Criteria Weights", "{}");
        assert!(spec.check(&ParamValue::Text(r#"{"slope": 0.3}"#.to_string())).is_ok());
        assert!(spec.check(&ParamValue::Text("{slope".to_string())).is_err());
    }

    #[test]
    fn test_numeric_select_option_from_command_line() {
        let spec =
            ParameterSpec::select("confidence", "Confidence Level", "95", &["90", "95", "99"]);
        let resolved = spec.resolve(&ParamValue::parse("99")).unwrap();
        assert_eq!(resolved, ParamValue::Text("99".to_string()));

        let err = spec.resolve(&ParamValue::parse("98")).unwrap_err();
        assert!(matches!(err, GeoflowError::Validation { ref field, .. } if field == "confidence"));
    }

    #[test]
    fn test_bare_number_for_json_text() {
        let spec = ParameterSpec::json_text("criteria_weights", "Criteria Weights", "{}");
        assert_eq!(
            spec.resolve(&ParamValue::parse("0.5")).unwrap(),
            ParamValue::Text("0.5".to_string())
        );
    }

    #[test]
    fn test_numeric_text_for_slider() {
        let spec = ParameterSpec::slider("threshold", "Vegetation Threshold", 0.3, 0.1, 0.8);
        assert_eq!(
            spec.resolve(&ParamValue::Text("0.4".to_string())).unwrap(),
            ParamValue::Number(0.4)
        );
    }
}
