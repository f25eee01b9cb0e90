use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::output::{expand_pattern, select_pattern, OutputDefaults};
use super::plugin::{AnnotatedTarget, Generator};
use crate::annotation::bind;
use crate::error::{GenError, TargetError};
use crate::scanner::{ScanResult, TargetKind};

/// Targets routed to one generator
pub struct Batch<'g> {
    pub generator: &'g dyn Generator,
    pub targets: Vec<AnnotatedTarget>,
}

/// Result of routing a scan to the registered generators
#[derive(Default)]
pub struct Dispatch<'g> {
    /// Non-empty batches in priority order
    pub batches: Vec<Batch<'g>>,
    /// Annotation instances that could not be bound
    pub errors: Vec<TargetError>,
}

impl Dispatch<'_> {
    pub fn target_count(&self) -> usize {
        self.batches.iter().map(|b| b.targets.len()).sum()
    }

    pub fn batch(&self, generator: &str) -> Option<&[AnnotatedTarget]> {
        self.batches
            .iter()
            .find(|b| b.generator.name() == generator)
            .map(|b| b.targets.as_slice())
    }
}

/// Ordered list of generators
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: Vec<Box<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator; a generator with the same name is replaced
    pub fn register(&mut self, generator: Box<dyn Generator>) -> &mut Self {
        match self.generators.iter().position(|g| g.name() == generator.name()) {
            Some(idx) => self.generators[idx] = generator,
            None => self.generators.push(generator),
        }
        self
    }

    /// Drop generators not accepted by `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&dyn Generator) -> bool) {
        self.generators.retain(|g| keep(g.as_ref()));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Generator> {
        self.generators
            .iter()
            .find(|g| g.name() == name)
            .map(|g| g.as_ref())
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Every annotation name some generator handles
    pub fn annotation_names(&self) -> BTreeSet<String> {
        self.generators
            .iter()
            .flat_map(|g| g.annotations().iter().map(|a| a.to_string()))
            .collect()
    }

    /// Generators sorted by priority, registration order breaking ties
    pub fn by_priority(&self) -> Vec<&dyn Generator> {
        let mut sorted: Vec<&dyn Generator> = self.generators.iter().map(|g| g.as_ref()).collect();
        sorted.sort_by_key(|g| g.priority());
        sorted
    }

    /// Route every annotation instance of every target to its generator.
    ///
    /// Each instance becomes its own [`AnnotatedTarget`], so a struct carrying
    /// two `@Pick` annotations produces two entries in the pick batch.
    pub fn dispatch(&self, scan: &ScanResult, defaults: &OutputDefaults) -> Dispatch<'_> {
        let mut dispatch = Dispatch::default();

        for generator in self.by_priority() {
            let mut batch = Vec::new();
            for file in &scan.files {
                for target in &file.targets {
                    let target = Arc::new(target.clone());
                    for annotation in target.annotations_named(generator.annotations()) {
                        let kind_ok = generator.target_kinds().contains(&target.kind);
                        let bound = if kind_ok {
                            bind(generator.params(), annotation).map_err(GenError::from)
                        } else {
                            Err(unsupported_kind(annotation.name.as_str(), target.kind))
                        };

                        let output = expand_pattern(
                            select_pattern(
                                annotation,
                                &file.config,
                                defaults,
                                generator.name(),
                                generator.default_output(),
                            ),
                            &target.file_path,
                        );
                        let annotated = AnnotatedTarget {
                            target: Arc::clone(&target),
                            annotation: annotation.clone(),
                            output,
                            params: Default::default(),
                        };

                        match bound {
                            Ok(params) => batch.push(AnnotatedTarget { params, ..annotated }),
                            Err(e) => dispatch.errors.push(annotated.error(generator.name(), e)),
                        }
                    }
                }
            }

            if !batch.is_empty() {
                debug!("Dispatched {} targets to {}", batch.len(), generator.name());
                dispatch.batches.push(Batch {
                    generator,
                    targets: batch,
                });
            }
        }

        dispatch
    }
}

fn unsupported_kind(annotation: &str, kind: TargetKind) -> GenError {
    GenError::invalid(format!("@{annotation} cannot be attached to a {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, ParamKind, ParamSpec};
    use crate::core::plugin::{GenContext, GenerateOutput};
    use crate::scanner::{FileConfig, FileScan, Target};
    use std::path::PathBuf;

    struct Fake {
        name: &'static str,
        priority: i32,
    }

    const FAKE_PARAMS: &[ParamSpec] = &[ParamSpec::required("name", ParamKind::String, "name")];

    impl Generator for Fake {
        fn name(&self) -> &str {
            self.name
        }
        fn annotations(&self) -> &[&'static str] {
            &["Pick"]
        }
        fn target_kinds(&self) -> &[TargetKind] {
            &[TargetKind::Struct]
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn params(&self) -> &[ParamSpec] {
            FAKE_PARAMS
        }
        fn default_output(&self) -> &str {
            "$FILE_fake.go"
        }
        fn generate(&self, _ctx: &GenContext<'_>, _targets: &[AnnotatedTarget]) -> GenerateOutput {
            GenerateOutput::default()
        }
    }

    fn target(kind: TargetKind, name: &str, annotations: Vec<Annotation>) -> Target {
        Target {
            kind,
            name: name.to_string(),
            package_name: "m".to_string(),
            file_path: PathBuf::from("/p/m/user.go"),
            line: 3,
            column: 6,
            annotations,
            value: None,
            type_text: None,
        }
    }

    fn scan(targets: Vec<Target>) -> ScanResult {
        ScanResult {
            files: vec![FileScan {
                path: PathBuf::from("/p/m/user.go"),
                package_name: "m".to_string(),
                targets,
                config: FileConfig::default(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_each_annotation_instance_is_a_target() {
        let mut registry = GeneratorRegistry::new();
        registry.register(Box::new(Fake {
            name: "pick",
            priority: 100,
        }));

        let user = target(
            TargetKind::Struct,
            "User",
            vec![
                Annotation::new("Pick").with_param("name", "A"),
                Annotation::new("Pick").with_param("name", "B").with_param("output", "b.go"),
            ],
        );
        let dispatch = registry.dispatch(&scan(vec![user]), &OutputDefaults::default());

        let batch = dispatch.batch("pick").unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].params.str("name"), Some("A"));
        assert_eq!(batch[0].output, PathBuf::from("/p/m/user_fake.go"));
        assert_eq!(batch[1].params.str("name"), Some("B"));
        assert_eq!(batch[1].output, PathBuf::from("/p/m/b.go"));
        assert!(Arc::ptr_eq(&batch[0].target, &batch[1].target));
    }

    #[test]
    fn test_binding_and_kind_errors_are_collected() {
        let mut registry = GeneratorRegistry::new();
        registry.register(Box::new(Fake {
            name: "pick",
            priority: 100,
        }));

        let targets = vec![
            target(TargetKind::Struct, "NoName", vec![Annotation::new("Pick")]),
            target(TargetKind::Var, "ErrX", vec![Annotation::new("Pick").with_param("name", "X")]),
        ];
        let dispatch = registry.dispatch(&scan(targets), &OutputDefaults::default());

        assert_eq!(dispatch.target_count(), 0);
        assert_eq!(dispatch.errors.len(), 2);
        assert!(dispatch.errors[0].message.contains("missing required parameter 'name'"));
        assert!(dispatch.errors[1].message.contains("cannot be attached to a var"));
    }

    #[test]
    fn test_priority_order_and_replacement() {
        let mut registry = GeneratorRegistry::new();
        registry
            .register(Box::new(Fake {
                name: "late",
                priority: 200,
            }))
            .register(Box::new(Fake {
                name: "early",
                priority: 10,
            }))
            .register(Box::new(Fake {
                name: "late",
                priority: 5,
            }));

        let names: Vec<&str> = registry.by_priority().iter().map(|g| g.name()).collect();
        assert_eq!(names, ["late", "early"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.annotation_names().into_iter().collect::<Vec<_>>(), ["Pick"]);
    }
}
