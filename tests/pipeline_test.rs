mod common;

use pipewright::ast::{
    BinaryOperator, BlockDefinition, Expression, Model, PipelineDefinition, TransformDefinition,
    TransformPortDefinition, UnaryOperator,
};
use pipewright::execution::{DebugGranularity, DebugTargets};
use pipewright::table::Tabular;
use pipewright::{Backend, ExitCode, InternalValue, Interpreter, RunConfig, ValueType};
use pretty_assertions::assert_eq;

use common::{registry_with, sheet};

fn cars() -> pipewright::table::Sheet {
    sheet(&[
        &["name", "mpg", "cyl"],
        &["Mazda RX4", "21", "6"],
        &["Datsun 710", "22,8", "4"],
        &["Hornet", "n/a", "6"],
        &["Valiant", "18.1", "six"],
        &["Merc 240D", "24.4", "4"],
    ])
}

fn liters_per_100km() -> TransformDefinition {
    TransformDefinition::new(
        "MpgToLitersPer100Km",
        vec![
            TransformPortDefinition::from("mpg", ValueType::DECIMAL),
            TransformPortDefinition::to("consumption", ValueType::DECIMAL),
        ],
        "consumption",
        Expression::unary(
            UnaryOperator::Round,
            Expression::binary(
                BinaryOperator::Divide,
                Expression::decimal(235.2),
                Expression::variable("mpg"),
            ),
        ),
    )
}

fn cars_pipeline(
    configure_interpreter: impl FnOnce(BlockDefinition) -> BlockDefinition,
) -> PipelineDefinition {
    PipelineDefinition::new("CarsPipeline")
        .with_block(BlockDefinition::new("CarsExtractor", "SheetSource"))
        .with_block(configure_interpreter(
            BlockDefinition::new("CarsInterpreter", "TableInterpreter").with_property(
                "columns",
                Expression::collection(vec![
                    Expression::column("name", ValueType::TEXT),
                    Expression::column("mpg", ValueType::DECIMAL),
                    Expression::column("cyl", ValueType::INTEGER),
                ]),
            ),
        ))
        .with_block(
            BlockDefinition::new("ConsumptionTransformer", "TableTransformer")
                .with_property("inputColumns", Expression::collection(vec![Expression::text("mpg")]))
                .with_property("outputColumn", Expression::text("consumption"))
                .with_property("use", Expression::transform(liters_per_100km())),
        )
        .with_block(BlockDefinition::new("CarsLoader", "TableSink"))
        .with_pipe(&[
            "CarsExtractor",
            "CarsInterpreter",
            "ConsumptionTransformer",
            "CarsLoader",
        ])
}

#[tokio::test]
async fn test_cars_pipeline_on_both_backends() {
    let mut statements = Vec::new();
    for backend in [Backend::Array, Backend::Columnar] {
        let (registry, collector) = registry_with(cars());
        let config = RunConfig {
            backend,
            debug: true,
            debug_granularity: DebugGranularity::Exhaustive,
            ..RunConfig::default()
        };
        let interpreter = Interpreter::with_registry(config, registry);
        let exit_code = interpreter
            .run(&Model::new(vec![cars_pipeline(|interpreter| interpreter)]))
            .await;
        assert_eq!(exit_code, ExitCode::Success);

        let tables = collector.tables();
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.backend(), backend);
        assert_eq!(table.column_names(), vec!["name", "mpg", "cyl", "consumption"]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.cell(1, 0), Some(InternalValue::text("Datsun 710")));
        assert_eq!(table.cell(1, 3), Some(InternalValue::Decimal(10.0)));
        statements.push(table.generate_insert_values_statement("cars").unwrap());
    }
    assert_eq!(statements[0], statements[1]);
    assert_eq!(
        statements[0],
        "INSERT INTO \"cars\" (\"name\",\"mpg\",\"cyl\",\"consumption\") VALUES \
         ('Mazda RX4',21,6,11), ('Datsun 710',22.8,4,10), ('Merc 240D',24.4,4,10)"
    );
}

#[tokio::test]
async fn test_header_from_runtime_parameter() {
    let headerless = sheet(&[&["Mazda RX4", "21", "6"], &["Merc 240D", "24.4", "4"]]);
    let pipeline =
        || cars_pipeline(|interpreter| interpreter.with_runtime_parameter("header", "HAS_HEADER"));

    let (registry, collector) = registry_with(headerless.clone());
    let config = RunConfig::default().with_runtime_parameter("HAS_HEADER", "false");
    let interpreter = Interpreter::with_registry(config, registry);
    assert_eq!(interpreter.run_pipeline(pipeline()).await, ExitCode::Success);
    assert_eq!(collector.tables()[0].num_rows(), 2);

    // Missing parameter fails the run before anything reaches the sink.
    let (registry, collector) = registry_with(headerless);
    let interpreter = Interpreter::with_registry(RunConfig::default(), registry);
    assert_eq!(interpreter.run_pipeline(pipeline()).await, ExitCode::Failure);
    assert!(collector.tables().is_empty());
}

#[tokio::test]
async fn test_shared_output_is_copied_per_child() {
    let pipeline = PipelineDefinition::new("Fanout")
        .with_block(BlockDefinition::new("Extractor", "SheetSource"))
        .with_block(
            BlockDefinition::new("Interpreter", "TableInterpreter").with_property(
                "columns",
                Expression::collection(vec![Expression::column("mpg", ValueType::DECIMAL)]),
            ),
        )
        .with_block(
            BlockDefinition::new("Transformer", "TableTransformer")
                .with_property("inputColumns", Expression::collection(vec![Expression::text("mpg")]))
                .with_property("outputColumn", Expression::text("mpg"))
                .with_property("use", Expression::transform(liters_per_100km())),
        )
        .with_block(BlockDefinition::new("RawLoader", "TableSink"))
        .with_block(BlockDefinition::new("TransformedLoader", "TableSink"))
        .with_pipe(&["Extractor", "Interpreter", "RawLoader"])
        .with_pipe(&["Interpreter", "Transformer", "TransformedLoader"]);

    let (registry, collector) = registry_with(cars());
    let config = RunConfig {
        debug: true,
        debug_targets: DebugTargets::Blocks(vec!["Transformer".to_string()]),
        ..RunConfig::default()
    };
    let interpreter = Interpreter::with_registry(config, registry);
    assert_eq!(interpreter.run_pipeline(pipeline).await, ExitCode::Success);

    let tables = collector.tables();
    assert_eq!(tables.len(), 2);
    let raw = &tables[0];
    let transformed = &tables[1];
    assert_eq!(raw.cell(0, 0), Some(InternalValue::Decimal(21.0)));
    assert_eq!(transformed.cell(0, 0), Some(InternalValue::Decimal(11.0)));
}

#[tokio::test]
async fn test_independent_pipelines_run_concurrently() {
    let (registry, collector) = registry_with(cars());
    let interpreter = Interpreter::with_registry(RunConfig::default(), registry);
    let model = Model::new(vec![
        cars_pipeline(|interpreter| interpreter),
        PipelineDefinition::new("Second")
            .with_block(BlockDefinition::new("Extractor", "SheetSource"))
            .with_block(
                BlockDefinition::new("Interpreter", "TableInterpreter")
                    .with_property("columns", Expression::collection(vec![])),
            )
            .with_block(BlockDefinition::new("Loader", "TableSink"))
            .with_pipe(&["Extractor", "Interpreter", "Loader"]),
    ]);
    assert_eq!(interpreter.run(&model).await, ExitCode::Success);
    assert_eq!(collector.tables().len(), 2);
}
