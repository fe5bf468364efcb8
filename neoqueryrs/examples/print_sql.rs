use std::{env, fs, path::PathBuf};

use neoquery::{init_tracing, NeoQueryConfig, QueryCompiler, QueryRequest, VariableInterpolator};

fn usage() {
    eprintln!("Usage: print_sql <request_json> [datasource]");
    eprintln!("Example: cargo run --example print_sql -- request.json plant-a");
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let request_path = PathBuf::from(args.remove(0));
    let datasource = args.pop().unwrap_or_default();

    let config = NeoQueryConfig::load_default();
    init_tracing(&config.logging);
    let resolved = config.for_datasource(&datasource);

    let request_str = fs::read_to_string(request_path)?;
    let request: QueryRequest = serde_json::from_str(&request_str)?;

    let compiler = QueryCompiler::new(resolved.compiler);
    for compiled in compiler.compile_all(&request, &VariableInterpolator::new()) {
        let ref_id = compiled.spec.ref_id.as_deref().unwrap_or("-");
        println!("-- {ref_id}");
        println!("{}", compiled.sql);
    }
    Ok(())
}
