use blocks::{BlockKind, RawBlockDescriptor, SchemaError, infer_kind, normalize};

fn names(set: &indexmap::IndexSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}

#[test]
fn statement_prefixes() {
    assert_eq!(infer_kind("print('hi')"), BlockKind::Statement);
    assert_eq!(infer_kind("for i in range(3):\n    pass"), BlockKind::Statement);
    assert_eq!(infer_kind("while True:\n    pass"), BlockKind::Statement);
    assert_eq!(infer_kind("if x:\n    pass"), BlockKind::Statement);
    assert_eq!(infer_kind("def f():\n    pass"), BlockKind::Statement);
    assert_eq!(infer_kind("class A:\n    pass"), BlockKind::Statement);
    assert_eq!(infer_kind("return x"), BlockKind::Statement);
    assert_eq!(infer_kind("try:\n    pass"), BlockKind::Statement);
    assert_eq!(infer_kind("with open(p) as f:\n    pass"), BlockKind::Statement);
}

#[test]
fn expressions_by_default() {
    assert_eq!(infer_kind("1 + 2"), BlockKind::Expression);
    assert_eq!(infer_kind("'hello'"), BlockKind::Expression);
    assert_eq!(infer_kind("len(xs)"), BlockKind::Expression);
    assert_eq!(infer_kind(""), BlockKind::Expression);
    assert_eq!(infer_kind("   \n "), BlockKind::Expression);
}

#[test]
fn prefix_needs_its_trailing_space() {
    // "for" without a space is an identifier, not a loop.
    assert_eq!(infer_kind("format(x)"), BlockKind::Expression);
    assert_eq!(infer_kind("iffy"), BlockKind::Expression);
}

#[test]
fn sample_is_trimmed_before_matching() {
    assert_eq!(infer_kind("   \n  print(1)"), BlockKind::Statement);

    let raw = RawBlockDescriptor::new("essentials_var_set")
        .with_fields(["VAR"])
        .with_value_inputs(["VALUE"])
        .with_code_sample("  x = 1  \n");
    let schema = normalize(&raw).unwrap();
    assert_eq!(schema.code_sample, "x = 1");
    assert_eq!(schema.kind, BlockKind::Expression);
}

#[test]
fn every_listed_name_is_required() {
    let raw = RawBlockDescriptor::new("control_if_truthy")
        .with_value_inputs(["EXPR"])
        .with_statement_inputs(["THEN", "ELSE"])
        .with_code_sample("if x:\n    pass\nelse:\n    pass");
    let schema = normalize(&raw).unwrap();

    assert_eq!(schema.kind, BlockKind::Statement);
    assert!(schema.fields.is_empty());
    assert_eq!(names(&schema.value_inputs), vec!["EXPR"]);
    assert_eq!(names(&schema.statement_inputs), vec!["THEN", "ELSE"]);
}

#[test]
fn repeated_names_collapse() {
    let raw = RawBlockDescriptor::new("essentials_num_arithmetic")
        .with_fields(["OP", "OP"])
        .with_value_inputs(["A", "B", "A"]);
    let schema = normalize(&raw).unwrap();
    assert_eq!(names(&schema.fields), vec!["OP"]);
    assert_eq!(names(&schema.value_inputs), vec!["A", "B"]);
}

#[test]
fn text_print_override_forces_statement_and_text_slot() {
    // The sample would classify as an expression and TEXT was never observed.
    let raw = RawBlockDescriptor::new("text_print").with_code_sample("");
    let schema = normalize(&raw).unwrap();

    assert_eq!(schema.kind, BlockKind::Statement);
    assert_eq!(names(&schema.value_inputs), vec!["TEXT"]);
}

#[test]
fn override_moves_injected_slot_out_of_other_kinds() {
    let raw = RawBlockDescriptor::new("text_print")
        .with_fields(["TEXT"])
        .with_code_sample("print('')");
    let schema = normalize(&raw).unwrap();

    assert!(schema.fields.is_empty());
    assert_eq!(names(&schema.value_inputs), vec!["TEXT"]);
    assert!(schema.overlapping_slot().is_none());
}

#[test]
fn override_leaves_other_types_alone() {
    let raw = RawBlockDescriptor::new("text_literal")
        .with_fields(["TEXT"])
        .with_code_sample("'abc'");
    let schema = normalize(&raw).unwrap();
    assert_eq!(schema.kind, BlockKind::Expression);
    assert_eq!(names(&schema.fields), vec!["TEXT"]);
    assert!(schema.value_inputs.is_empty());
}

#[test]
fn template_namespace_is_stripped() {
    let raw = RawBlockDescriptor::new("text_literal")
        .with_fields(["TEXT"])
        .with_xml_template(
            r#"<xml xmlns="https://developers.google.com/blockly/xml"><block type="text_literal" xmlns="https://developers.google.com/blockly/xml"><field name="TEXT"></field></block></xml>"#,
        );
    let schema = normalize(&raw).unwrap();
    assert_eq!(
        schema.xml_template,
        r#"<xml><block type="text_literal"><field name="TEXT"></field></block></xml>"#
    );
}

#[test]
fn provenance_is_carried() {
    let mut raw = RawBlockDescriptor::new("essentials_compare");
    raw.category = Some("Logic".to_string());
    raw.module = Some("essentials".to_string());
    let schema = normalize(&raw).unwrap();
    assert_eq!(schema.category, "Logic");
    assert_eq!(schema.module, "essentials");
}

#[test]
fn missing_type_is_rejected() {
    let raw = RawBlockDescriptor::new("  ");
    assert!(matches!(normalize(&raw), Err(SchemaError::MissingType)));
}

#[test]
fn slot_listed_twice_is_rejected() {
    let raw = RawBlockDescriptor::new("weird_block")
        .with_fields(["X"])
        .with_value_inputs(["X"]);
    match normalize(&raw) {
        Err(SchemaError::ConflictingSlot { block_type, name }) => {
            assert_eq!(block_type, "weird_block");
            assert_eq!(name, "X");
        }
        other => panic!("expected ConflictingSlot, got {:?}", other),
    }
}

#[test]
fn descriptor_json_shape() {
    let json = r#"{
        "type": "essentials_var_get",
        "category": null,
        "module": "essentials",
        "fields": ["VAR"],
        "python_sample": "x"
    }"#;
    let raw: RawBlockDescriptor = serde_json::from_str(json).unwrap();
    let schema = normalize(&raw).unwrap();
    assert_eq!(schema.block_type, "essentials_var_get");
    assert_eq!(schema.category, "");
    assert_eq!(schema.kind, BlockKind::Expression);
    assert_eq!(names(&schema.fields), vec!["VAR"]);
}
