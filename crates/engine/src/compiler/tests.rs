//! Tests for graph compilation

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::compiler::*;
    use crate::error::EngineError;
    use crate::graph::*;

    fn types() -> TypeRegistry {
        TypeRegistry::with_builtin_types().unwrap()
    }

    fn literal_bool(types: &TypeRegistry) -> BlockDecl {
        let bool_ty = types.resolve("Bool").unwrap();
        BlockDecl::unified(
            "LiteralBool",
            [
                PropDecl::new("value", bool_ty.clone()).control(),
                PropDecl::new("result", bool_ty)
                    .output()
                    .compile(MOTOKO, |args, _, _| Ok(args.get("value")?))
                    .compile(TYPE_KEY, |_, _, compiler| {
                        Ok(Some(Value::Type(compiler.types().resolve("Bool")?)))
                    }),
            ],
        )
    }

    fn and_block(types: &TypeRegistry) -> BlockDecl {
        let bool_ty = types.resolve("Bool").unwrap();
        BlockDecl::split("And")
            .input(PropDecl::new("a", bool_ty.clone()))
            .input(PropDecl::new("b", bool_ty.clone()))
            .output(PropDecl::new("result", bool_ty).compile(MOTOKO, |args, _, _| {
                Ok(Some(Value::text(format!("({} and {})", args.text("a")?, args.text("b")?))))
            }))
    }

    fn all_block(types: &TypeRegistry) -> BlockDecl {
        let bool_ty = types.resolve("Bool").unwrap();
        BlockDecl::unified(
            "All",
            [
                PropDecl::new("items", bool_ty.clone()).input().multi(),
                PropDecl::new("result", bool_ty).output().compile(MOTOKO, |args, _, _| {
                    Ok(Some(Value::text(format!("[{}]", args.texts("items")?.join(", ")))))
                }),
            ],
        )
    }

    /// One input per requirement: `opt` optional, `req` required without default.
    fn check_block(types: &TypeRegistry) -> BlockDecl {
        let principal = types.resolve("Principal").unwrap();
        BlockDecl::unified(
            "Check",
            [
                PropDecl::new("opt", principal.clone()).input().optional(),
                PropDecl::new("req", principal.clone()).input(),
                PropDecl::new("result", principal).output().compile(MOTOKO, |args, _, _| {
                    let opt = args.get("opt")?;
                    let req = args.get("req")?;
                    let again = args.get("req")?;
                    Ok(Some(Value::text(format!(
                        "{:?}/{:?}/{:?}",
                        opt.is_some(),
                        req.is_some(),
                        again.is_some()
                    ))))
                }),
            ],
        )
    }

    fn broken_block(types: &TypeRegistry) -> BlockDecl {
        let text = types.resolve("Text").unwrap();
        BlockDecl::unified(
            "Broken",
            [
                PropDecl::new("ok", text.clone())
                    .output()
                    .compile(MOTOKO, |_, _, _| Ok(Some(Value::text("fine")))),
                PropDecl::new("bad", text.clone())
                    .output()
                    .compile(MOTOKO, |_, _, _| anyhow::bail!("backend exploded")),
                PropDecl::new("unknown", text)
                    .output()
                    .compile(MOTOKO, |args, _, _| Ok(args.get("nope")?)),
            ],
        )
        .global()
    }

    /// `Seq.body` collects statements; its type decides the traversal side.
    fn seq_block(types: &TypeRegistry, body_ty: &str) -> BlockDecl {
        BlockDecl::unified(
            "Seq",
            [
                PropDecl::new("body", types.resolve(body_ty).unwrap()).input().multi(),
                PropDecl::new("result", types.resolve("Text").unwrap())
                    .output()
                    .compile(MOTOKO, |args, _, _| Ok(Some(Value::text(args.texts("body")?.join("; "))))),
            ],
        )
    }

    fn print_block(types: &TypeRegistry) -> BlockDecl {
        BlockDecl::unified(
            "Print",
            [
                PropDecl::new("message", types.resolve("Text").unwrap()).control(),
                PropDecl::new("effect", types.resolve("Effect").unwrap())
                    .output()
                    .compile(MOTOKO, |args, _, _| {
                        Ok(Some(Value::text(format!("print({:?})", args.text("message")?))))
                    }),
            ],
        )
    }

    fn loop_block(types: &TypeRegistry) -> BlockDecl {
        let bool_ty = types.resolve("Bool").unwrap();
        BlockDecl::unified(
            "Loop",
            [
                PropDecl::new("x", bool_ty.clone()).input().optional(),
                PropDecl::new("result", bool_ty)
                    .output()
                    .compile(MOTOKO, |args, _, _| Ok(Some(Value::text(format!("!{}", args.text("x")?))))),
            ],
        )
    }

    fn catalog(types: &TypeRegistry, body_ty: &str) -> BlockCatalog {
        let mut catalog = BlockCatalog::new();
        for decl in [
            literal_bool(types),
            and_block(types),
            all_block(types),
            check_block(types),
            broken_block(types),
            seq_block(types, body_ty),
            print_block(types),
            loop_block(types),
        ] {
            catalog.insert(decl).unwrap();
        }
        catalog
    }

    fn and_graph() -> GraphDescription {
        let mut graph = GraphDescription::new("and");
        graph.add_node(NodeInstance::new("lit", "LiteralBool").with_control("value", true.into()));
        graph.add_node(NodeInstance::new("and", "And").with_control("b", false.into()));
        graph.connect("lit", "result", "and", "a").unwrap();
        graph
    }

    #[test]
    fn test_and_of_literal_and_control() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let graph = and_graph();
        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);

        let value = compiler.get_output("and", "result").unwrap();
        assert_eq!(value, Some(Value::text("(true and false)")));
        assert!(compiler.events().is_empty());
    }

    #[test]
    fn test_single_connection_yields_scalar() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let graph = and_graph();
        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);

        assert_eq!(compiler.get_input("and", "a").unwrap(), Some(Value::Bool(true)));
        // Unconnected input falls back to the control value
        assert_eq!(compiler.get_input("and", "b").unwrap(), Some(Value::Bool(false)));
    }

    #[test]
    fn test_multi_input_preserves_connection_order() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = GraphDescription::new("all");
        graph.add_node(NodeInstance::new("t", "LiteralBool").with_control("value", true.into()));
        graph.add_node(NodeInstance::new("f", "LiteralBool").with_control("value", false.into()));
        graph.add_node(NodeInstance::new("all", "All"));
        graph.connect("f", "result", "all", "items").unwrap();
        graph.connect("t", "result", "all", "items").unwrap();
        graph.connect("f", "result", "all", "items").unwrap();

        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        let items = compiler.get_input("all", "items").unwrap().unwrap();
        assert_eq!(
            items,
            Value::List(vec![Value::Bool(false), Value::Bool(true), Value::Bool(false)])
        );
        assert_eq!(
            compiler.get_output("all", "result").unwrap(),
            Some(Value::text("[false, true, false]"))
        );
    }

    #[test]
    fn test_unconnected_multi_input_is_empty_list() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = GraphDescription::new("all");
        graph.add_node(NodeInstance::new("all", "All"));

        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        assert_eq!(compiler.get_input("all", "items").unwrap(), Some(Value::List(Vec::new())));
        assert_eq!(compiler.get_output("all", "result").unwrap(), Some(Value::text("[]")));
        assert!(compiler.events().is_empty());
    }

    #[test]
    fn test_optional_and_missing_inputs() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = GraphDescription::new("check");
        graph.add_node(NodeInstance::new("check", "Check"));

        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        let value = compiler.get_output("check", "result").unwrap();
        assert_eq!(value, Some(Value::text("false/false/false")));

        // `req` is read twice but reported once
        let events = compiler.events();
        assert_eq!(
            events,
            vec![CompileEvent::MissingInput {
                node: "check".to_string(),
                block: "Check".to_string(),
                key: "req".to_string(),
            }]
        );
    }

    #[test]
    fn test_reverse_flow_reads_output_side() {
        let types = types();
        let mut graph = GraphDescription::new("seq");
        graph.add_node(NodeInstance::new("seq", "Seq"));
        graph.add_node(NodeInstance::new("p1", "Print").with_control("message", "one".into()));
        graph.add_node(NodeInstance::new("p2", "Print").with_control("message", "two".into()));
        // Statement chains are stored from the collecting node outward
        graph.connect("seq", "body", "p1", "effect").unwrap();
        graph.connect("seq", "body", "p2", "effect").unwrap();

        let reversed = catalog(&types, "Effect");
        let compiler = Compiler::new(&graph, &reversed, &types, MOTOKO);
        assert_eq!(
            compiler.get_output("seq", "result").unwrap(),
            Some(Value::text(r#"print("one"); print("two")"#))
        );

        // Same graph, forward-typed body: the input side has no connections
        let forward = catalog(&types, "Text");
        let compiler = Compiler::new(&graph, &forward, &types, MOTOKO);
        assert_eq!(compiler.get_output("seq", "result").unwrap(), Some(Value::text("")));
    }

    #[test]
    fn test_failing_output_is_isolated() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = GraphDescription::new("broken");
        graph.add_node(NodeInstance::new("x", "Broken"));

        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        let report = compiler.compile_program().unwrap();

        let values: Vec<_> = report.outputs.iter().map(|o| (o.key.as_str(), o.value.clone())).collect();
        assert_eq!(
            values,
            vec![("ok", Some(Value::text("fine"))), ("bad", None), ("unknown", None)]
        );
        assert_eq!(report.events.len(), 2);
        assert!(matches!(
            &report.events[0],
            CompileEvent::Warning { key, message, .. } if key == "bad" && message == "backend exploded"
        ));
        assert!(matches!(
            &report.events[1],
            CompileEvent::Warning { key, message, .. } if key == "unknown" && message.contains("Unknown input")
        ));
        assert_eq!(report.render("\n"), "fine");
        assert!(report.has_warnings());
    }

    #[test]
    fn test_schema_errors_are_returned() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = and_graph();
        graph.add_node(NodeInstance::new("ghost", "Ghost"));
        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);

        assert!(matches!(
            compiler.get_output("and", "nope"),
            Err(EngineError::PropertyNotFound { .. })
        ));
        assert!(matches!(compiler.get_input("missing", "a"), Err(EngineError::UnknownNode(_))));
        assert!(matches!(compiler.get_output("ghost", "a"), Err(EngineError::UnknownBlock(_))));

        let args = compiler.input_args("and").unwrap();
        assert!(matches!(args.get("result"), Err(EngineError::UnknownInput { .. })));
        assert!(matches!(args.get("zzz"), Err(EngineError::UnknownInput { .. })));
        assert_eq!(args.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_output_direction_input_is_absent() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let graph = and_graph();
        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        assert_eq!(compiler.get_input("and", "result").unwrap(), None);
    }

    #[test]
    fn test_input_args_are_memoized_per_call() {
        let types = types();
        let text = types.resolve("Text").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut blocks = BlockCatalog::new();
        blocks
            .insert(BlockDecl::unified(
                "Source",
                [PropDecl::new("out", text.clone()).output().compile(MOTOKO, move |_, _, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(Value::text("s")))
                })],
            ))
            .unwrap();
        blocks
            .insert(BlockDecl::unified(
                "Twice",
                [
                    PropDecl::new("in", text.clone()).input(),
                    PropDecl::new("out", text).output().compile(MOTOKO, |args, _, _| {
                        Ok(Some(Value::text(format!("{}{}", args.text("in")?, args.text("in")?))))
                    }),
                ],
            ))
            .unwrap();

        let mut graph = GraphDescription::new("memo");
        graph.add_node(NodeInstance::new("src", "Source"));
        graph.add_node(NodeInstance::new("twice", "Twice"));
        graph.connect("src", "out", "twice", "in").unwrap();

        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        assert_eq!(compiler.get_output("twice", "out").unwrap(), Some(Value::text("ss")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        compiler.get_output("twice", "out").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let args = compiler.input_args("twice").unwrap();
        args.prefetch().unwrap();
        args.get("in").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cycle_fails_only_the_reentrant_output() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = GraphDescription::new("loop");
        graph.add_node(NodeInstance::new("loop", "Loop"));
        graph.connect("loop", "result", "loop", "x").unwrap();

        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        assert_eq!(compiler.get_output("loop", "result").unwrap(), Some(Value::text("!")));

        let events = compiler.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            CompileEvent::Warning { node, message, .. } if node == "loop" && message.contains("Cycle detected")
        ));

        // The marker is released afterwards
        assert_eq!(compiler.get_output("loop", "result").unwrap(), Some(Value::text("!")));
    }

    #[test]
    fn test_post_compile_wraps_outputs_and_controls() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let graph = and_graph();
        let options = CompileOptions::default()
            .post_compile(|value, _, _, _| value.map(|v| Value::text(format!("<{}>", v))));
        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO).with_options(options);

        // lit.value is wrapped as a control and again as lit's output; and.b is a raw control fallback
        assert_eq!(
            compiler.get_output("and", "result").unwrap(),
            Some(Value::text("<(<<true>> and false)>"))
        );
    }

    #[test]
    fn test_default_compile_replaces_callbacks() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let graph = and_graph();
        let options = CompileOptions::default().default_compile(|prop, node, key, compiler| {
            Ok(Some(Value::text(format!(
                "{}.{}:{}:{}",
                node,
                key,
                prop.ty,
                compiler.compile_key()
            ))))
        });
        let compiler = Compiler::new(&graph, &blocks, &types, "other").with_options(options);
        assert_eq!(
            compiler.get_output("and", "result").unwrap(),
            Some(Value::text("and.result:Bool:other"))
        );
    }

    #[test]
    fn test_unknown_compile_key_yields_absent() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let graph = and_graph();
        let compiler = Compiler::new(&graph, &blocks, &types, "python");
        assert_eq!(compiler.get_output("and", "result").unwrap(), None);
        assert!(compiler.events().is_empty());
    }

    #[test]
    fn test_event_listeners() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = GraphDescription::new("check");
        graph.add_node(NodeInstance::new("check", "Check"));

        let seen = RefCell::new(Vec::new());
        let mut compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);
        compiler.on_event(|event| seen.borrow_mut().push(event.to_string()));
        compiler.get_output("check", "result").unwrap();
        drop(compiler);

        assert_eq!(seen.into_inner(), vec!["Missing input on Check (check): req".to_string()]);
    }

    #[test]
    fn test_type_strings_and_inference() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let graph = and_graph();
        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);

        let optional = types.instantiate("Optional", ["Int"]).unwrap();
        assert_eq!(compiler.get_type_string(&optional).unwrap(), "?Int");
        assert_eq!(compiler.get_type_string("Bool").unwrap(), "Bool");
        assert!(matches!(compiler.get_type_string("Nope"), Err(EngineError::UnknownType(_))));

        let inferred = compiler.infer_type("and", "a").unwrap();
        assert_eq!(inferred, Some(types.resolve("Bool").unwrap()));
        // And has no `type` callback of its own
        assert_eq!(compiler.infer_type("and", "result").unwrap(), None);
    }

    #[test]
    fn test_compile_program_only_visits_global_nodes() {
        let types = types();
        let blocks = catalog(&types, "Effect");
        let mut graph = and_graph();
        graph.add_node(NodeInstance::new("x", "Broken"));
        let compiler = Compiler::new(&graph, &blocks, &types, MOTOKO);

        let report = compiler.compile_program().unwrap();
        assert!(report.outputs.iter().all(|o| o.node == "x"));
        assert_eq!(report.outputs.len(), 3);
    }
}
