use std::sync::Arc;

use parking_lot::Mutex;
use whistle_data::{Dataset, VecDataset};
use whistle_ir::MergeMode;

use super::*;
use crate::cancel::CancellationToken;
use crate::context::DEFAULT_FRAME_LIMIT;
use crate::errors::EvalErrorKind;
use crate::function::NativeFunction;
use crate::meta::SharedMeta;
use crate::options::{EnabledOptions, MERGE_MODES_EXPERIMENT};
use crate::overload::ParamType;
use crate::package::PackageContext;
use crate::registry::{Registries, RegistrySet};
use crate::target::{pop_side_catcher, push_side_catcher, side_stack_depth, TargetConstructor};

fn context(set: RegistrySet, options: EnabledOptions) -> RuntimeContext {
    RuntimeContext::new(
        PackageContext::new("test"),
        Registries::new(set),
        SharedMeta::new(),
        CancellationToken::new(),
        options,
        DEFAULT_FRAME_LIMIT,
    )
}

fn plain_context() -> RuntimeContext {
    context(RegistrySet::default(), EnabledOptions::new())
}

fn c(entries: &[(&str, Data)]) -> Data {
    Data::container_of(
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone())),
    )
}

mod variable_writes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn var_mapping_binds_a_frame_variable() {
        let mut ctx = plain_context();
        let mapping = FieldMapping::var("a", "", ValueSource::ConstString("aaa".to_string()));
        execute_mapping(&mut ctx, &mapping).unwrap();
        assert_eq!(ctx.top_frame().lookup("a"), Some(Data::str("aaa")));
    }

    #[test]
    fn whole_plain_variable_writes_replace() {
        let mut ctx = plain_context();
        for value in ["one", "two"] {
            let mapping = FieldMapping::var("x", "", ValueSource::ConstString(value.to_string()));
            execute_mapping(&mut ctx, &mapping).unwrap();
        }
        assert_eq!(ctx.top_frame().lookup("x"), Some(Data::str("two")));
    }

    #[test]
    fn null_write_to_whole_plain_variable_is_observable() {
        let mut ctx = plain_context();
        ctx.top_frame().set_local("x", Data::str("set"));
        let mapping = FieldMapping {
            value: ValueSource::local("unset"),
            target: Some(MappingTarget::Var {
                name: "x".to_string(),
                path: String::new(),
            }),
            iterate: false,
            merge_mode: None,
        };
        execute_mapping(&mut ctx, &mapping).unwrap();
        assert_eq!(ctx.top_frame().lookup("x"), Some(Data::Null));
    }

    #[test]
    fn null_write_into_a_sub_path_is_skipped() {
        let mut ctx = plain_context();
        ctx.top_frame()
            .set_local("x", c(&[("keep", Data::num(1.0))]));
        let mapping = FieldMapping {
            value: ValueSource::local("unset"),
            target: Some(MappingTarget::Var {
                name: "x".to_string(),
                path: "keep".to_string(),
            }),
            iterate: false,
            merge_mode: None,
        };
        execute_mapping(&mut ctx, &mapping).unwrap();
        assert_eq!(
            ctx.top_frame().lookup("x"),
            Some(c(&[("keep", Data::num(1.0))]))
        );
    }

    #[test]
    fn variable_paths_merge_by_default() {
        let mut ctx = plain_context();
        execute_mapping(
            &mut ctx,
            &FieldMapping::var("x", "a", ValueSource::ConstInt(1)),
        )
        .unwrap();
        execute_mapping(
            &mut ctx,
            &FieldMapping::var("x", "b", ValueSource::ConstInt(2)),
        )
        .unwrap();
        assert_eq!(
            ctx.top_frame().lookup("x"),
            Some(c(&[("a", Data::num(1.0)), ("b", Data::num(2.0))]))
        );
    }
}

mod output_writes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn untargeted_mapping_writes_the_output() {
        let mut ctx = plain_context();
        let mapping = FieldMapping::output(ValueSource::ConstString("out".to_string()));
        execute_mapping(&mut ctx, &mapping).unwrap();
        assert_eq!(ctx.top_frame().lookup(OUTPUT_VAR), Some(Data::str("out")));
    }

    #[test]
    fn field_mappings_accumulate_under_merge() {
        let mut ctx = plain_context();
        execute_mapping(&mut ctx, &FieldMapping::field("a", ValueSource::ConstInt(1))).unwrap();
        execute_mapping(&mut ctx, &FieldMapping::field("b", ValueSource::ConstInt(2))).unwrap();
        assert_eq!(
            ctx.top_frame().lookup(OUTPUT_VAR),
            Some(c(&[("a", Data::num(1.0)), ("b", Data::num(2.0))]))
        );
    }

    #[test]
    fn output_sentinel_path_addresses_the_whole_output() {
        let mut ctx = plain_context();
        ctx.top_frame()
            .set_local(OUTPUT_VAR, c(&[("a", Data::num(1.0))]));
        let mapping = FieldMapping::field(OUTPUT_VAR, ValueSource::ConstInt(9))
            .with_merge_mode(MergeMode::Merge);
        execute_mapping(&mut ctx, &mapping).unwrap();
        // Primitive incoming replaces under MERGE.
        assert_eq!(ctx.top_frame().lookup(OUTPUT_VAR), Some(Data::num(9.0)));
    }

    #[test]
    fn null_merge_into_nonempty_output_is_a_no_op() {
        let mut ctx = plain_context();
        let existing = c(&[("keep", Data::str("v"))]);
        ctx.top_frame().set_local(OUTPUT_VAR, existing.clone());

        let mapping = FieldMapping::output(ValueSource::local("unset"));
        execute_mapping(&mut ctx, &mapping).unwrap();
        assert_eq!(ctx.top_frame().lookup(OUTPUT_VAR), Some(existing));
    }
}

mod merge_mode_gating {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explicit_non_default_mode_requires_the_experiment() {
        let mut ctx = plain_context();
        let mapping = FieldMapping::var("x", "", ValueSource::ConstInt(1))
            .with_merge_mode(MergeMode::Append);
        let err = execute_mapping(&mut ctx, &mapping).unwrap_err();
        assert!(matches!(
            err.kind,
            EvalErrorKind::UnsupportedOperation { ref required, .. }
                if required.contains(MERGE_MODES_EXPERIMENT)
        ));
    }

    #[test]
    fn explicit_default_mode_needs_no_option() {
        let mut ctx = plain_context();
        let mapping = FieldMapping::var("x", "", ValueSource::ConstInt(1))
            .with_merge_mode(MergeMode::Replace);
        execute_mapping(&mut ctx, &mapping).unwrap();
        assert_eq!(ctx.top_frame().lookup("x"), Some(Data::num(1.0)));
    }

    #[test]
    fn enabled_experiment_unlocks_explicit_modes() {
        let mut ctx = context(
            RegistrySet::default(),
            EnabledOptions::from_names([MERGE_MODES_EXPERIMENT.to_string()]),
        );
        for value in [1, 2] {
            let mapping = FieldMapping::var("x", "", ValueSource::ConstInt(value))
                .with_merge_mode(MergeMode::Append);
            execute_mapping(&mut ctx, &mapping).unwrap();
        }
        assert_eq!(
            ctx.top_frame().lookup("x"),
            Some(Data::array(vec![Data::num(1.0), Data::num(2.0)]))
        );
    }
}

mod iteration {
    use super::*;
    use pretty_assertions::assert_eq;

    fn iterated_into_output(value: ValueSource) -> FieldMapping {
        FieldMapping::output(value).iterated()
    }

    #[test]
    fn arrays_iterate_in_order() {
        let mut ctx = plain_context();
        ctx.top_frame().set_local(
            "src",
            Data::array(vec![c(&[("a", Data::num(1.0))]), c(&[("b", Data::num(2.0))])]),
        );
        execute_mapping(&mut ctx, &iterated_into_output(ValueSource::local("src"))).unwrap();
        assert_eq!(
            ctx.top_frame().lookup(OUTPUT_VAR),
            Some(c(&[("a", Data::num(1.0)), ("b", Data::num(2.0))]))
        );
    }

    #[test]
    fn containers_iterate_their_values() {
        let mut ctx = plain_context();
        ctx.top_frame().set_local(
            "src",
            c(&[
                ("first", c(&[("a", Data::num(1.0))])),
                ("second", c(&[("b", Data::num(2.0))])),
            ]),
        );
        execute_mapping(&mut ctx, &iterated_into_output(ValueSource::local("src"))).unwrap();
        assert_eq!(
            ctx.top_frame().lookup(OUTPUT_VAR),
            Some(c(&[("a", Data::num(1.0)), ("b", Data::num(2.0))]))
        );
    }

    #[test]
    fn datasets_iterate_their_items() {
        let mut ctx = plain_context();
        ctx.top_frame().set_local(
            "src",
            Data::Dataset(Dataset::new(VecDataset::new(vec![c(&[(
                "a",
                Data::num(1.0),
            )])]))),
        );
        execute_mapping(&mut ctx, &iterated_into_output(ValueSource::local("src"))).unwrap();
        assert_eq!(
            ctx.top_frame().lookup(OUTPUT_VAR),
            Some(c(&[("a", Data::num(1.0))]))
        );
    }

    #[test]
    fn absent_sources_iterate_zero_times() {
        let mut ctx = plain_context();
        for source in [ValueSource::local("unset"), ValueSource::local("empty")] {
            ctx.top_frame().set_local("empty", Data::array(vec![]));
            execute_mapping(&mut ctx, &iterated_into_output(source)).unwrap();
        }
        assert_eq!(ctx.top_frame().lookup(OUTPUT_VAR), None);
    }

    #[test]
    fn non_iterable_sources_name_their_kind() {
        let mut ctx = plain_context();
        let err = execute_mapping(
            &mut ctx,
            &iterated_into_output(ValueSource::ConstInt(3)),
        )
        .unwrap_err();
        assert!(
            matches!(err.kind, EvalErrorKind::NotIterable { ref kind } if kind == "primitive")
        );
    }
}

mod side_outputs {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn side_writes_fall_back_to_the_root_output() {
        let mut ctx = plain_context();
        let mapping = FieldMapping {
            value: ValueSource::ConstInt(1),
            target: Some(MappingTarget::Field {
                path: "warned".to_string(),
                side: true,
            }),
            iterate: false,
            merge_mode: None,
        };
        execute_mapping(&mut ctx, &mapping).unwrap();
        assert_eq!(
            ctx.bottom_frame().lookup(OUTPUT_VAR),
            Some(c(&[("warned", Data::num(1.0))]))
        );
    }

    #[test]
    fn an_active_catcher_absorbs_side_writes() {
        let mut ctx = plain_context();
        push_side_catcher(ctx.meta());

        for (path, value) in [("a", 1), ("b", 2)] {
            let mapping = FieldMapping {
                value: ValueSource::ConstInt(value),
                target: Some(MappingTarget::Field {
                    path: path.to_string(),
                    side: true,
                }),
                iterate: false,
                merge_mode: None,
            };
            execute_mapping(&mut ctx, &mapping).unwrap();
            assert_eq!(side_stack_depth(ctx.meta()), 1, "one catcher per level");
        }

        assert_eq!(
            pop_side_catcher(ctx.meta()),
            Some(c(&[("a", Data::num(1.0)), ("b", Data::num(2.0))]))
        );
        assert_eq!(ctx.bottom_frame().lookup(OUTPUT_VAR), None);
    }

    #[test]
    fn nested_catchers_absorb_innermost_first() {
        let mut ctx = plain_context();
        push_side_catcher(ctx.meta());
        push_side_catcher(ctx.meta());

        let mapping = FieldMapping {
            value: ValueSource::ConstInt(1),
            target: Some(MappingTarget::Field {
                path: "inner".to_string(),
                side: true,
            }),
            iterate: false,
            merge_mode: None,
        };
        execute_mapping(&mut ctx, &mapping).unwrap();

        assert_eq!(
            pop_side_catcher(ctx.meta()),
            Some(c(&[("inner", Data::num(1.0))]))
        );
        assert_eq!(pop_side_catcher(ctx.meta()), Some(Data::empty_container()));
        assert_eq!(pop_side_catcher(ctx.meta()), None);
    }
}

mod custom_sinks {
    use super::*;
    use pretty_assertions::assert_eq;

    struct MetaSinkTarget {
        key: String,
    }

    impl Target for MetaSinkTarget {
        fn write(&mut self, ctx: &mut RuntimeContext, value: Data) -> EvalResult<()> {
            let merged = crate::merge::merge_values(
                ctx.meta().get_meta(&self.key).unwrap_or(Data::Null),
                value,
            );
            ctx.meta().set_meta(self.key.clone(), merged);
            Ok(())
        }
    }

    struct MetaSinkConstructor;

    impl TargetConstructor for MetaSinkConstructor {
        fn name(&self) -> &str {
            "metaSink"
        }

        fn construct(
            &self,
            _ctx: &mut RuntimeContext,
            args: &[Data],
        ) -> EvalResult<Box<dyn Target>> {
            let key = args
                .first()
                .and_then(Data::as_str)
                .unwrap_or("metaSink")
                .to_string();
            Ok(Box::new(MetaSinkTarget { key }))
        }
    }

    fn custom_mapping(value: ValueSource) -> FieldMapping {
        FieldMapping {
            value,
            target: Some(MappingTarget::Custom {
                package: Some("test".to_string()),
                name: "metaSink".to_string(),
                args: vec![ValueSource::ConstString("sunk".to_string())],
            }),
            iterate: false,
            merge_mode: None,
        }
    }

    #[test]
    fn a_single_registered_constructor_wins() {
        let mut set = RegistrySet::default();
        set.targets
            .register("test", "metaSink", Arc::new(MetaSinkConstructor));
        let mut ctx = context(set, EnabledOptions::new());

        execute_mapping(&mut ctx, &custom_mapping(ValueSource::ConstInt(5))).unwrap();
        assert_eq!(ctx.meta().get_meta("sunk"), Some(Data::num(5.0)));
    }

    #[test]
    fn overloaded_constructors_are_rejected() {
        let mut set = RegistrySet::default();
        set.targets
            .register("test", "metaSink", Arc::new(MetaSinkConstructor));
        set.targets
            .register("test", "metaSink", Arc::new(MetaSinkConstructor));
        let mut ctx = context(set, EnabledOptions::new());

        let err = execute_mapping(&mut ctx, &custom_mapping(ValueSource::ConstInt(5)))
            .unwrap_err();
        assert!(matches!(
            err.kind,
            EvalErrorKind::OverloadedTarget { count: 2, .. }
        ));
    }

    #[test]
    fn unregistered_sinks_fall_back_to_a_function_call() {
        let collected: Arc<Mutex<Vec<(Data, Data)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let collected = collected.clone();
            NativeFunction::new(
                "test",
                "collect",
                vec![ParamType::Any, ParamType::Any],
                move |_, args| {
                    collected
                        .lock()
                        .push((args[0].clone(), args[1].clone()));
                    Ok(Data::str("discarded"))
                },
            )
        };
        let mut set = RegistrySet::default();
        set.functions.register("test", "collect", Arc::new(sink));
        let mut ctx = context(set, EnabledOptions::new());

        ctx.top_frame().set_local(
            "src",
            Data::array(vec![Data::num(1.0), Data::num(2.0)]),
        );
        let mapping = FieldMapping {
            value: ValueSource::local("src"),
            target: Some(MappingTarget::Custom {
                package: None,
                name: "collect".to_string(),
                args: vec![ValueSource::ConstString("tag".to_string())],
            }),
            iterate: true,
            merge_mode: None,
        };
        execute_mapping(&mut ctx, &mapping).unwrap();

        // The write parameter binds last, once per element, and per-write
        // results are discarded.
        assert_eq!(
            *collected.lock(),
            vec![
                (Data::str("tag"), Data::num(1.0)),
                (Data::str("tag"), Data::num(2.0)),
            ]
        );
        assert_eq!(ctx.top_frame().lookup(OUTPUT_VAR), None);
    }
}
