//! Context classification
//!
//! Partitions audio attributes into car audio contexts. The registry is
//! immutable after construction; `context_for` is total and maps anything the
//! registry does not know to `CarAudioContext::Invalid`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cabin_core::{AudioAttribute, AudioUsage, CabinError, CarAudioContext, Result};

/// One registry row: a context and the attributes that classify into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub context: CarAudioContext,
    pub attributes: Vec<AudioAttribute>,
}

impl ContextInfo {
    pub fn new(context: CarAudioContext, usages: &[AudioUsage]) -> Self {
        Self {
            context,
            attributes: usages.iter().copied().map(AudioAttribute::new).collect(),
        }
    }
}

/// The built-in attribute → context registry
pub fn default_registry() -> Vec<ContextInfo> {
    use AudioUsage as U;
    use CarAudioContext as C;

    vec![
        ContextInfo::new(C::Media, &[U::Unknown, U::Media, U::Game]),
        ContextInfo::new(C::Navigation, &[U::AssistanceNavigationGuidance]),
        ContextInfo::new(C::VoiceCommand, &[U::AssistanceAccessibility, U::Assistant]),
        ContextInfo::new(C::CallRing, &[U::NotificationRingtone]),
        ContextInfo::new(
            C::Call,
            &[
                U::VoiceCommunication,
                U::CallAssistant,
                U::VoiceCommunicationSignalling,
            ],
        ),
        ContextInfo::new(C::Alarm, &[U::Alarm]),
        ContextInfo::new(C::Notification, &[U::Notification, U::NotificationEvent]),
        ContextInfo::new(C::SystemSound, &[U::AssistanceSonification]),
        ContextInfo::new(C::Emergency, &[U::Emergency]),
        ContextInfo::new(C::Safety, &[U::Safety]),
        ContextInfo::new(C::VehicleStatus, &[U::VehicleStatus]),
        ContextInfo::new(C::Announcement, &[U::Announcement]),
    ]
}

/// Static attribute ↔ context registry
#[derive(Debug, Clone)]
pub struct ContextClassifier {
    by_attribute: HashMap<AudioAttribute, CarAudioContext>,
    by_context: BTreeMap<CarAudioContext, Vec<AudioAttribute>>,
}

impl ContextClassifier {
    /// Build a classifier from a registry
    ///
    /// # Errors
    /// `CabinError::Construction` when the registry is empty, lists INVALID or
    /// a context twice, has a context without attributes, claims one attribute
    /// for two contexts, or misses the car-system or non-car-system partition.
    pub fn new(registry: Vec<ContextInfo>) -> Result<Self> {
        if registry.is_empty() {
            return Err(CabinError::construction("context registry is empty"));
        }

        let mut by_attribute = HashMap::new();
        let mut by_context = BTreeMap::new();

        for info in registry {
            if !info.context.is_valid() {
                return Err(CabinError::construction(
                    "INVALID context cannot carry audio attributes",
                ));
            }
            if info.attributes.is_empty() {
                return Err(CabinError::construction(format!(
                    "context {} has no audio attributes",
                    info.context
                )));
            }
            for attribute in &info.attributes {
                if let Some(existing) = by_attribute.insert(*attribute, info.context) {
                    if existing != info.context {
                        return Err(CabinError::construction(format!(
                            "attribute {attribute} claimed by both {existing} and {}",
                            info.context
                        )));
                    }
                }
            }
            if by_context.insert(info.context, info.attributes).is_some() {
                return Err(CabinError::construction(format!(
                    "context {} listed twice",
                    info.context
                )));
            }
        }

        let classifier = Self {
            by_attribute,
            by_context,
        };
        if classifier.car_system_contexts().is_empty() {
            return Err(CabinError::construction(
                "context registry has no car-system contexts",
            ));
        }
        if classifier.non_car_system_contexts().is_empty() {
            return Err(CabinError::construction(
                "context registry has no non-car-system contexts",
            ));
        }
        Ok(classifier)
    }

    /// Context an attribute classifies into; INVALID when unsupported
    pub fn context_for(&self, attribute: &AudioAttribute) -> CarAudioContext {
        self.by_attribute
            .get(attribute)
            .copied()
            .unwrap_or(CarAudioContext::Invalid)
    }

    /// Attributes registered for a context
    ///
    /// # Errors
    /// `CabinError::InvalidArgument` for INVALID or a context the registry does
    /// not contain.
    pub fn attributes_for(&self, context: CarAudioContext) -> Result<&[AudioAttribute]> {
        self.by_context
            .get(&context)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                CabinError::invalid_argument(format!("context {context} is not registered"))
            })
    }

    /// Resolve a context id against the registry
    ///
    /// # Errors
    /// `CabinError::InvalidContext` for 0, unknown ids, or unregistered contexts.
    pub fn context_from_id(&self, id: i32) -> Result<CarAudioContext> {
        CarAudioContext::from_id(id)
            .filter(|context| self.by_context.contains_key(context))
            .ok_or(CabinError::InvalidContext(id))
    }

    /// Name of a registered context
    pub fn name_of(&self, context: CarAudioContext) -> Result<&'static str> {
        self.attributes_for(context).map(|_| context.name())
    }

    /// Every registered context (never INVALID), in id order
    pub fn all_contexts(&self) -> Vec<CarAudioContext> {
        self.by_context.keys().copied().collect()
    }

    pub fn car_system_contexts(&self) -> Vec<CarAudioContext> {
        self.by_context
            .keys()
            .copied()
            .filter(|context| context.is_car_system())
            .collect()
    }

    pub fn non_car_system_contexts(&self) -> Vec<CarAudioContext> {
        self.by_context
            .keys()
            .copied()
            .filter(|context| !context.is_car_system())
            .collect()
    }

    /// Distinct valid contexts for a list of attributes
    pub fn unique_contexts<'a, I>(&self, attributes: I) -> BTreeSet<CarAudioContext>
    where
        I: IntoIterator<Item = &'a AudioAttribute>,
    {
        attributes
            .into_iter()
            .map(|attribute| self.context_for(attribute))
            .filter(|context| context.is_valid())
            .collect()
    }
}

impl Default for ContextClassifier {
    /// Classifier over the built-in registry
    fn default() -> Self {
        let mut by_attribute = HashMap::new();
        let mut by_context = BTreeMap::new();
        for info in default_registry() {
            for attribute in &info.attributes {
                by_attribute.insert(*attribute, info.context);
            }
            by_context.insert(info.context, info.attributes);
        }
        Self {
            by_attribute,
            by_context,
        }
    }
}
