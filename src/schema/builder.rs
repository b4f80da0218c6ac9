//! Schema assembly and the single-pass validator.
//!
//! Elements are accumulated as mutable definitions, then frozen by
//! [`SchemaBuilder::build`]. Validation resolves every OID and name
//! reference, applies superior inheritance, and memoizes a per-element
//! verdict so diamond-shaped superior graphs validate each element once.
//! A superior chain that loops back into an element still being validated
//! is reported as an explicit circular-reference error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{SchemaError, SchemaResult, SchemaWarning};
use crate::schema::attribute_type::{AttributeType, AttributeTypeDefinition};
use crate::schema::content_rule::{DitContentRule, DitContentRuleDefinition};
use crate::schema::matching_rule::{MatchingRule, MatchingRuleUse, MatchingRuleUseDefinition};
use crate::schema::object_class::{ObjectClass, ObjectClassDefinition, ObjectClassKind};
use crate::schema::registry::{Schema, SchemaInner};
use crate::schema::syntax::Syntax;

pub(crate) const TOP_OBJECT_CLASS_OID: &str = "2.5.6.0";

/// JSON document shape accepted by [`SchemaBuilder::load_json`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaDocument {
    pub attribute_types: Vec<AttributeTypeDefinition>,
    pub object_classes: Vec<ObjectClassDefinition>,
    pub dit_content_rules: Vec<DitContentRuleDefinition>,
    pub matching_rule_uses: Vec<MatchingRuleUseDefinition>,
}

/// Accumulates schema element definitions and freezes them into a
/// validated [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    syntaxes: Vec<Syntax>,
    matching_rules: Vec<MatchingRule>,
    attribute_types: Vec<AttributeTypeDefinition>,
    object_classes: Vec<ObjectClassDefinition>,
    content_rules: Vec<DitContentRuleDefinition>,
    rule_uses: Vec<MatchingRuleUseDefinition>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_syntax(mut self, syntax: Syntax) -> Self {
        self.syntaxes.push(syntax);
        self
    }

    pub fn add_matching_rule(mut self, rule: MatchingRule) -> Self {
        self.matching_rules.push(rule);
        self
    }

    pub fn add_attribute_type(mut self, definition: AttributeTypeDefinition) -> Self {
        self.attribute_types.push(definition);
        self
    }

    pub fn add_object_class(mut self, definition: ObjectClassDefinition) -> Self {
        self.object_classes.push(definition);
        self
    }

    pub fn add_dit_content_rule(mut self, definition: DitContentRuleDefinition) -> Self {
        self.content_rules.push(definition);
        self
    }

    pub fn add_matching_rule_use(mut self, definition: MatchingRuleUseDefinition) -> Self {
        self.rule_uses.push(definition);
        self
    }

    /// Load definitions from a JSON [`SchemaDocument`].
    pub fn load_json(mut self, json: &str) -> SchemaResult<Self> {
        let document: SchemaDocument =
            serde_json::from_str(json).map_err(|e| SchemaError::DefinitionFormat {
                detail: e.to_string(),
            })?;
        self.attribute_types.extend(document.attribute_types);
        self.object_classes.extend(document.object_classes);
        self.content_rules.extend(document.dit_content_rules);
        self.rule_uses.extend(document.matching_rule_uses);
        Ok(self)
    }

    /// Validate everything and freeze. On failure every collected error is
    /// returned; warnings do not fail the build and are kept on the schema.
    pub fn build(self) -> Result<Schema, Vec<SchemaError>> {
        Validator::new(self).run()
    }
}

/// Per-element validation verdict, memoized across the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValidationState {
    Unvalidated,
    /// On the current validation path; seeing this again means a cycle.
    Validating,
    Valid,
    Invalid,
}

struct Validator {
    syntaxes: HashMap<String, Arc<Syntax>>,
    matching_rules: HashMap<String, Arc<MatchingRule>>,
    matching_rule_names: HashMap<String, String>,

    attribute_defs: HashMap<String, AttributeTypeDefinition>,
    attribute_names: HashMap<String, String>,
    class_defs: HashMap<String, ObjectClassDefinition>,
    class_names: HashMap<String, String>,
    content_rule_defs: Vec<DitContentRuleDefinition>,
    rule_use_defs: Vec<MatchingRuleUseDefinition>,

    attribute_states: HashMap<String, ValidationState>,
    class_states: HashMap<String, ValidationState>,
    resolved_attributes: HashMap<String, Arc<AttributeType>>,
    resolved_classes: HashMap<String, Arc<ObjectClass>>,
    /// Whether a validated class transitively reaches `top`.
    reaches_top: HashMap<String, bool>,

    errors: Vec<SchemaError>,
    warnings: Vec<SchemaWarning>,
}

impl Validator {
    fn new(builder: SchemaBuilder) -> Self {
        let mut validator = Self {
            syntaxes: HashMap::new(),
            matching_rules: HashMap::new(),
            matching_rule_names: HashMap::new(),
            attribute_defs: HashMap::new(),
            attribute_names: HashMap::new(),
            class_defs: HashMap::new(),
            class_names: HashMap::new(),
            content_rule_defs: builder.content_rules,
            rule_use_defs: builder.rule_uses,
            attribute_states: HashMap::new(),
            class_states: HashMap::new(),
            resolved_attributes: HashMap::new(),
            resolved_classes: HashMap::new(),
            reaches_top: HashMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        for syntax in builder.syntaxes {
            if !syntax.has_handler() {
                validator.warnings.push(SchemaWarning::UnhandledSyntax {
                    oid: syntax.oid().to_string(),
                });
            }
            let oid = syntax.oid().to_string();
            if validator.syntaxes.insert(oid.clone(), Arc::new(syntax)).is_some() {
                validator.errors.push(SchemaError::DuplicateOid {
                    kind: "syntax",
                    oid,
                });
            }
        }

        for rule in builder.matching_rules {
            let oid = rule.oid().to_string();
            for name in rule.names() {
                validator
                    .matching_rule_names
                    .entry(name.to_lowercase())
                    .or_insert_with(|| oid.clone());
            }
            if validator.matching_rules.insert(oid.clone(), Arc::new(rule)).is_some() {
                validator.errors.push(SchemaError::DuplicateOid {
                    kind: "matching rule",
                    oid,
                });
            }
        }

        for definition in builder.attribute_types {
            if definition.oid.is_empty() {
                validator.errors.push(SchemaError::MissingOid {
                    kind: "attribute type",
                });
                continue;
            }
            let oid = definition.oid.clone();
            for name in &definition.names {
                validator
                    .attribute_names
                    .entry(name.to_lowercase())
                    .or_insert_with(|| oid.clone());
            }
            validator.attribute_states.insert(oid.clone(), ValidationState::Unvalidated);
            if validator.attribute_defs.insert(oid.clone(), definition).is_some() {
                validator.errors.push(SchemaError::DuplicateOid {
                    kind: "attribute type",
                    oid,
                });
            }
        }

        for definition in builder.object_classes {
            if definition.oid.is_empty() {
                validator.errors.push(SchemaError::MissingOid {
                    kind: "object class",
                });
                continue;
            }
            let oid = definition.oid.clone();
            for name in &definition.names {
                validator
                    .class_names
                    .entry(name.to_lowercase())
                    .or_insert_with(|| oid.clone());
            }
            validator.class_states.insert(oid.clone(), ValidationState::Unvalidated);
            if validator.class_defs.insert(oid.clone(), definition).is_some() {
                validator.errors.push(SchemaError::DuplicateOid {
                    kind: "object class",
                    oid,
                });
            }
        }

        validator
    }

    fn run(mut self) -> Result<Schema, Vec<SchemaError>> {
        let attribute_oids: Vec<String> = self.attribute_defs.keys().cloned().collect();
        for oid in attribute_oids {
            self.validate_attribute(&oid);
        }

        let class_oids: Vec<String> = self.class_defs.keys().cloned().collect();
        for oid in class_oids {
            self.validate_class(&oid);
        }

        let content_rule_defs = std::mem::take(&mut self.content_rule_defs);
        let mut content_rules = HashMap::new();
        for definition in &content_rule_defs {
            if let Some(rule) = self.validate_content_rule(definition) {
                let oid = rule.structural_class_oid().to_string();
                if content_rules.insert(oid.clone(), Arc::new(rule)).is_some() {
                    self.errors.push(SchemaError::DuplicateOid {
                        kind: "DIT content rule",
                        oid,
                    });
                }
            }
        }

        let rule_use_defs = std::mem::take(&mut self.rule_use_defs);
        let mut rule_uses = HashMap::new();
        for definition in &rule_use_defs {
            if let Some(rule_use) = self.validate_rule_use(definition) {
                let oid = rule_use.matching_rule_oid().to_string();
                if rule_uses.insert(oid.clone(), Arc::new(rule_use)).is_some() {
                    self.errors.push(SchemaError::DuplicateOid {
                        kind: "matching rule use",
                        oid,
                    });
                }
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        for warning in &self.warnings {
            warn!("schema validation: {warning}");
        }

        let mut attribute_type_names = HashMap::new();
        for attribute in self.resolved_attributes.values() {
            for name in attribute.names() {
                attribute_type_names
                    .entry(name.to_lowercase())
                    .or_insert_with(|| attribute.oid().to_string());
            }
        }
        let mut object_class_names = HashMap::new();
        for class in self.resolved_classes.values() {
            for name in class.names() {
                object_class_names
                    .entry(name.to_lowercase())
                    .or_insert_with(|| class.oid().to_string());
            }
        }

        Ok(Schema::from_inner(SchemaInner {
            syntaxes: self.syntaxes,
            matching_rules: self.matching_rules,
            matching_rule_names: self.matching_rule_names,
            attribute_types: self.resolved_attributes,
            attribute_type_names,
            object_classes: self.resolved_classes,
            object_class_names,
            content_rules,
            matching_rule_uses: rule_uses,
            warnings: self.warnings,
        }))
    }

    /// Resolve a matching rule reference (OID or name) to its OID.
    fn resolve_matching_rule(&self, reference: &str) -> Option<String> {
        if self.matching_rules.contains_key(reference) {
            return Some(reference.to_string());
        }
        self.matching_rule_names.get(&reference.to_lowercase()).cloned()
    }

    /// Resolve an attribute reference (OID or name) to its declared OID.
    fn resolve_attribute_oid(&self, reference: &str) -> Option<String> {
        if self.attribute_defs.contains_key(reference) {
            return Some(reference.to_string());
        }
        self.attribute_names.get(&reference.to_lowercase()).cloned()
    }

    fn resolve_class_oid(&self, reference: &str) -> Option<String> {
        if self.class_defs.contains_key(reference) {
            return Some(reference.to_string());
        }
        self.class_names.get(&reference.to_lowercase()).cloned()
    }

    /// Validate one attribute type, recursing into its superior first.
    /// Returns whether the element ended up valid.
    fn validate_attribute(&mut self, oid: &str) -> bool {
        match self.attribute_states.get(oid) {
            Some(ValidationState::Valid) => return true,
            Some(ValidationState::Invalid) => return false,
            Some(ValidationState::Validating) => {
                self.errors.push(SchemaError::CircularReference {
                    kind: "attribute type",
                    oid: oid.to_string(),
                });
                return false;
            }
            Some(ValidationState::Unvalidated) => {}
            None => return false,
        }
        self.attribute_states
            .insert(oid.to_string(), ValidationState::Validating);

        let definition = self.attribute_defs[oid].clone();
        let mut valid = true;

        let mut superior_oid = None;
        let mut superior = None;
        if let Some(reference) = &definition.superior {
            match self.resolve_attribute_oid(reference) {
                Some(resolved) => {
                    if self.validate_attribute(&resolved) {
                        superior = self.resolved_attributes.get(&resolved).cloned();
                        superior_oid = Some(resolved);
                    } else {
                        self.errors.push(SchemaError::InvalidDependency {
                            kind: "attribute type",
                            oid: oid.to_string(),
                            dependency: resolved,
                        });
                        valid = false;
                    }
                }
                None => {
                    self.errors.push(SchemaError::unknown_reference(
                        "attribute type",
                        oid,
                        "superior attribute type",
                        reference,
                    ));
                    valid = false;
                }
            }
        }

        // Syntax and matching rules fall back to the superior's resolved
        // values when not declared.
        let syntax_oid = definition
            .syntax
            .clone()
            .or_else(|| superior.as_ref().map(|s| s.syntax_oid().to_string()));
        let syntax_oid = match syntax_oid {
            Some(syntax_oid) => {
                if !self.syntaxes.contains_key(&syntax_oid) {
                    self.errors.push(SchemaError::unknown_reference(
                        "attribute type",
                        oid,
                        "syntax",
                        &syntax_oid,
                    ));
                    valid = false;
                }
                syntax_oid
            }
            None => {
                self.errors.push(SchemaError::MissingSyntax {
                    oid: oid.to_string(),
                });
                valid = false;
                String::new()
            }
        };

        // Each rule slot resolves in order: declared on the element,
        // inherited from the superior, then the syntax default.
        let syntax = self.syntaxes.get(&syntax_oid).cloned();
        let mut resolve_rule = |validator: &mut Self,
                                declared: &Option<String>,
                                inherited: Option<&str>|
         -> Option<String> {
            match declared {
                Some(reference) => match validator.resolve_matching_rule(reference) {
                    Some(resolved) => Some(resolved),
                    None => {
                        validator.errors.push(SchemaError::unknown_reference(
                            "attribute type",
                            oid,
                            "matching rule",
                            reference,
                        ));
                        valid = false;
                        None
                    }
                },
                None => inherited.map(str::to_string),
            }
        };
        let equality = resolve_rule(
            self,
            &definition.equality,
            superior
                .as_ref()
                .and_then(|s| s.equality_rule_oid())
                .or_else(|| syntax.as_ref().and_then(|s| s.equality_rule_oid())),
        );
        let ordering = resolve_rule(
            self,
            &definition.ordering,
            superior
                .as_ref()
                .and_then(|s| s.ordering_rule_oid())
                .or_else(|| syntax.as_ref().and_then(|s| s.ordering_rule_oid())),
        );
        let substring = resolve_rule(
            self,
            &definition.substring,
            superior
                .as_ref()
                .and_then(|s| s.substring_rule_oid())
                .or_else(|| syntax.as_ref().and_then(|s| s.substring_rule_oid())),
        );
        let approximate = resolve_rule(
            self,
            &definition.approximate,
            superior
                .as_ref()
                .and_then(|s| s.approximate_rule_oid())
                .or_else(|| syntax.as_ref().and_then(|s| s.approximate_rule_oid())),
        );

        if definition.collective && definition.usage.is_operational() {
            self.warnings.push(SchemaWarning::CollectiveOperationalAttribute {
                oid: oid.to_string(),
                usage: definition.usage.to_string(),
            });
        }
        if definition.no_user_modification && !definition.usage.is_operational() {
            self.warnings.push(SchemaWarning::NoUserModificationNotOperational {
                oid: oid.to_string(),
            });
        }

        if valid {
            debug!("resolved attribute type {oid}");
            self.resolved_attributes.insert(
                oid.to_string(),
                Arc::new(AttributeType::resolved(
                    &definition,
                    superior_oid,
                    syntax_oid,
                    equality,
                    ordering,
                    substring,
                    approximate,
                )),
            );
        }
        self.attribute_states.insert(
            oid.to_string(),
            if valid {
                ValidationState::Valid
            } else {
                ValidationState::Invalid
            },
        );
        valid
    }

    /// Validate one object class, recursing into superiors first.
    fn validate_class(&mut self, oid: &str) -> bool {
        match self.class_states.get(oid) {
            Some(ValidationState::Valid) => return true,
            Some(ValidationState::Invalid) => return false,
            Some(ValidationState::Validating) => {
                self.errors.push(SchemaError::CircularReference {
                    kind: "object class",
                    oid: oid.to_string(),
                });
                return false;
            }
            Some(ValidationState::Unvalidated) => {}
            None => return false,
        }
        self.class_states
            .insert(oid.to_string(), ValidationState::Validating);

        let definition = self.class_defs[oid].clone();
        let mut valid = true;

        let mut superior_oids = Vec::new();
        let mut required = BTreeSet::new();
        let mut optional = BTreeSet::new();
        let mut derives_from_top = oid == TOP_OBJECT_CLASS_OID;

        for reference in &definition.superiors {
            let Some(resolved) = self.resolve_class_oid(reference) else {
                self.errors.push(SchemaError::unknown_reference(
                    "object class",
                    oid,
                    "superior object class",
                    reference,
                ));
                valid = false;
                continue;
            };
            if !self.validate_class(&resolved) {
                self.errors.push(SchemaError::InvalidDependency {
                    kind: "object class",
                    oid: oid.to_string(),
                    dependency: resolved,
                });
                valid = false;
                continue;
            }
            let superior = self.resolved_classes[&resolved].clone();
            if !definition.kind.may_derive_from(superior.kind()) {
                self.errors.push(SchemaError::InvalidSuperiorKind {
                    oid: oid.to_string(),
                    kind: definition.kind.to_string(),
                    superior_oid: resolved.clone(),
                    superior_kind: superior.kind().to_string(),
                });
                valid = false;
                continue;
            }
            derives_from_top |= self.reaches_top.get(&resolved).copied().unwrap_or(false);
            required.extend(superior.required_attribute_oids().map(str::to_string));
            optional.extend(superior.optional_attribute_oids().map(str::to_string));
            superior_oids.push(resolved);
        }

        if definition.kind == ObjectClassKind::Structural && !derives_from_top {
            self.errors.push(SchemaError::NotDerivedFromTop {
                oid: oid.to_string(),
            });
            valid = false;
        }

        for (references, target) in [
            (&definition.required, &mut required),
            (&definition.optional, &mut optional),
        ] {
            for reference in references {
                match self.resolve_attribute_oid(reference) {
                    Some(attribute_oid) => {
                        if self.validate_attribute(&attribute_oid) {
                            target.insert(attribute_oid);
                        } else {
                            self.errors.push(SchemaError::InvalidDependency {
                                kind: "object class",
                                oid: oid.to_string(),
                                dependency: attribute_oid,
                            });
                            valid = false;
                        }
                    }
                    None => {
                        self.errors.push(SchemaError::unknown_reference(
                            "object class",
                            oid,
                            "attribute type",
                            reference,
                        ));
                        valid = false;
                    }
                }
            }
        }

        if valid {
            debug!("resolved object class {oid}");
            self.reaches_top.insert(oid.to_string(), derives_from_top);
            self.resolved_classes.insert(
                oid.to_string(),
                Arc::new(ObjectClass::resolved(
                    &definition,
                    superior_oids,
                    required,
                    optional,
                )),
            );
        }
        self.class_states.insert(
            oid.to_string(),
            if valid {
                ValidationState::Valid
            } else {
                ValidationState::Invalid
            },
        );
        valid
    }

    fn validate_content_rule(
        &mut self,
        definition: &DitContentRuleDefinition,
    ) -> Option<DitContentRule> {
        let reference = &definition.structural_class;
        let Some(structural_oid) = self.resolve_class_oid(reference) else {
            self.errors.push(SchemaError::unknown_reference(
                "DIT content rule",
                reference,
                "object class",
                reference,
            ));
            return None;
        };
        if !self.validate_class(&structural_oid) {
            self.errors.push(SchemaError::InvalidDependency {
                kind: "DIT content rule",
                oid: structural_oid.clone(),
                dependency: structural_oid.clone(),
            });
            return None;
        }
        let structural = self.resolved_classes[&structural_oid].clone();
        let mut valid = true;
        if structural.kind() != ObjectClassKind::Structural {
            self.errors.push(SchemaError::ContentRuleClassKind {
                structural_oid: structural_oid.clone(),
                oid: structural_oid.clone(),
                expected: "structural".to_string(),
                actual: structural.kind().to_string(),
            });
            valid = false;
        }

        let mut auxiliaries = BTreeSet::new();
        let mut auxiliary_classes = Vec::new();
        for reference in &definition.auxiliaries {
            let Some(resolved) = self.resolve_class_oid(reference) else {
                self.errors.push(SchemaError::unknown_reference(
                    "DIT content rule",
                    &structural_oid,
                    "auxiliary object class",
                    reference,
                ));
                valid = false;
                continue;
            };
            if !self.validate_class(&resolved) {
                self.errors.push(SchemaError::InvalidDependency {
                    kind: "DIT content rule",
                    oid: structural_oid.clone(),
                    dependency: resolved,
                });
                valid = false;
                continue;
            }
            let class = self.resolved_classes[&resolved].clone();
            if class.kind() != ObjectClassKind::Auxiliary {
                self.errors.push(SchemaError::ContentRuleClassKind {
                    structural_oid: structural_oid.clone(),
                    oid: resolved.clone(),
                    expected: "auxiliary".to_string(),
                    actual: class.kind().to_string(),
                });
                valid = false;
                continue;
            }
            auxiliaries.insert(resolved);
            auxiliary_classes.push(class);
        }

        let mut resolve_set = |validator: &mut Self, references: &[String]| -> BTreeSet<String> {
            let mut out = BTreeSet::new();
            for reference in references {
                match validator.resolve_attribute_oid(reference) {
                    Some(attribute_oid) if validator.validate_attribute(&attribute_oid) => {
                        out.insert(attribute_oid);
                    }
                    _ => {
                        validator.errors.push(SchemaError::unknown_reference(
                            "DIT content rule",
                            &structural_oid,
                            "attribute type",
                            reference,
                        ));
                        valid = false;
                    }
                }
            }
            out
        };
        let required = resolve_set(self, &definition.required);
        let optional = resolve_set(self, &definition.optional);
        let prohibited = resolve_set(self, &definition.prohibited);

        // A prohibited attribute must not be required by the structural
        // class or any permitted auxiliary class.
        for attribute_oid in &prohibited {
            let mut required_by = None;
            if structural.required_attribute_oids().any(|a| a == attribute_oid) {
                required_by = Some(structural_oid.clone());
            }
            for class in &auxiliary_classes {
                if class.required_attribute_oids().any(|a| a == attribute_oid) {
                    required_by = Some(class.oid().to_string());
                }
            }
            if let Some(required_by) = required_by {
                self.errors.push(SchemaError::ProhibitedAttributeRequired {
                    structural_oid: structural_oid.clone(),
                    attribute: attribute_oid.clone(),
                    required_by,
                });
                valid = false;
            }
        }

        valid.then(|| {
            debug!("resolved DIT content rule for {structural_oid}");
            DitContentRule::resolved(
                definition,
                structural_oid,
                auxiliaries,
                required,
                optional,
                prohibited,
            )
        })
    }

    fn validate_rule_use(
        &mut self,
        definition: &MatchingRuleUseDefinition,
    ) -> Option<MatchingRuleUse> {
        let Some(rule_oid) = self.resolve_matching_rule(&definition.matching_rule) else {
            self.errors.push(SchemaError::unknown_reference(
                "matching rule use",
                &definition.matching_rule,
                "matching rule",
                &definition.matching_rule,
            ));
            return None;
        };
        if self.matching_rules[&rule_oid].is_obsolete() {
            self.warnings.push(SchemaWarning::ObsoleteMatchingRule {
                oid: rule_oid.clone(),
            });
        }

        let mut valid = true;
        let mut attribute_oids = BTreeSet::new();
        for reference in &definition.applies_to {
            match self.resolve_attribute_oid(reference) {
                Some(attribute_oid) if self.validate_attribute(&attribute_oid) => {
                    attribute_oids.insert(attribute_oid);
                }
                _ => {
                    self.errors.push(SchemaError::unknown_reference(
                        "matching rule use",
                        &rule_oid,
                        "attribute type",
                        reference,
                    ));
                    valid = false;
                }
            }
        }

        valid.then(|| MatchingRuleUse::resolved(definition, rule_oid, attribute_oids))
    }
}
