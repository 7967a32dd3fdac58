use schemars::schema_for;
use sf_core::entities::{FileRecord, Study, StudySummary};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{SchemaArgs, SchemaType};
use crate::output::output;

fn schema(type_name: SchemaType) -> schemars::Schema {
    match type_name {
        SchemaType::Study => schema_for!(Study),
        SchemaType::File => schema_for!(FileRecord),
        SchemaType::Summary => schema_for!(StudySummary),
    }
}

/// Handle `sfw schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&schema(args.type_name), flags.format)
}
