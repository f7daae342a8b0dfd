use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser as ClapParser, ValueEnum};
use tracing_subscriber::EnvFilter;

use filter_criteria::error::{self, ParseError};
use filter_criteria::{
    Catalog, Criteria, FilterField, Identifier, Parser, Render, Resolver, Syntax, Value, ValueType,
    docs,
};

const DEMO_FILTER: &str = "(status eq InTransit or status eq Delivered) and substring(CustomerName, 1, 3) eq 'Jim'";

#[derive(ClapParser)]
#[command(name = "filter-criteria", version, about = "Compiles filter expressions into parameterized SQL")]
struct Cli {
    /// Filter expression, e.g. "status eq InTransit and CustomerName eq 'Jim'"
    #[arg(required_unless_present_any = ["demo", "operators"])]
    filter: Option<String>,

    /// Output syntax: sql, filter or placeholder
    #[arg(long, default_value = "sql")]
    syntax: Syntax,

    /// Field the filter may refer to
    #[arg(long = "field", value_name = "NAME=[QUALIFIER.]COLUMN[:TYPE]", value_parser = parse_field)]
    fields: Vec<(String, FilterField)>,

    /// Named constant the filter may refer to
    #[arg(long = "constant", value_name = "NAME=LITERAL", value_parser = parse_constant)]
    constants: Vec<(String, Value)>,

    /// Use the Order/OrderType sample catalog (and sample filter when none is given)
    #[arg(long)]
    demo: bool,

    /// Print the operator table and exit
    #[arg(long, value_name = "FORMAT")]
    operators: Option<DocFormat>,

    /// List each parameter name once
    #[arg(long)]
    distinct: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DocFormat {
    Markdown,
    Html,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(format) = cli.operators {
        match format {
            DocFormat::Markdown => print!("{}", docs::to_markdown(false)),
            DocFormat::Html => print!("{}", docs::to_html()),
        }
        return ExitCode::SUCCESS;
    }

    let mut catalog = if cli.demo { demo_catalog() } else { Catalog::new() };
    for (name, field) in cli.fields {
        catalog.insert_field(&name, field);
    }
    for (name, value) in cli.constants {
        catalog.insert_constant(&name, value);
    }

    let source = cli.filter.unwrap_or_else(|| DEMO_FILTER.to_string());

    match run(&source, &catalog, true) {
        Ok(criteria) => {
            println!("{}", criteria.render(cli.syntax));
            let parameters = if cli.distinct {
                criteria.distinct_parameters()
            } else {
                criteria.all_parameters().collect()
            };
            for parameter in parameters {
                println!("{}: {}", parameter.name, parameter.value);
            }
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}

pub fn run<R: Resolver>(source: &str, resolver: &R, print_error: bool) -> Result<Criteria, ParseError> {
    let result = Parser::new(resolver).parse(source);

    if let Err(err) = &result {
        if print_error && error::print_error(source, err).is_err() {
            eprintln!("{}", err);
        }
    }

    result
}

/// Orders joined with their order type and an optional offer.
fn demo_catalog() -> Catalog {
    Catalog::new()
        .field("Id", Identifier::qualified("Order", "Id"), ValueType::Guid)
        .field("Status", Identifier::qualified("Order", "Status"), ValueType::Integer)
        .field(
            "StatusChangedOnUtc",
            Identifier::qualified("Order", "StatusChangedOnUtc"),
            ValueType::DateTime,
        )
        .field("CreatedOnUtc", Identifier::qualified("Order", "CreatedOnUtc"), ValueType::DateTime)
        .field("CustomerName", Identifier::qualified("Order", "CustomerName"), ValueType::String)
        .field("Address", Identifier::qualified("Order", "Address"), ValueType::String)
        .field("Type", Identifier::qualified("OrderType", "Type"), ValueType::Integer)
        .field("Name", Identifier::qualified("OrderType", "Name"), ValueType::String)
        .field("Description", Identifier::qualified("OrderType", "Description"), ValueType::String)
        .field("Offer", Identifier::qualified("o", "Name"), ValueType::String)
        .constant("Placed", 0)
        .constant("InPacking", 1)
        .constant("InTransit", 2)
        .constant("Delivered", 3)
        .constant("Standard", 0)
        .constant("Prime", 1)
}

/// `Status=Order.Status:integer`
fn parse_field(arg: &str) -> Result<(String, FilterField), String> {
    let (name, column) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=COLUMN, got '{}'", arg))?;
    let (column, value_type) = match column.rsplit_once(':') {
        Some((column, kind)) => {
            let value_type = ValueType::from_str(kind).map_err(|_| format!("unknown field type '{}'", kind))?;
            (column, value_type)
        }
        None => (column, ValueType::Unknown),
    };
    if name.is_empty() || column.is_empty() {
        return Err(format!("expected NAME=COLUMN, got '{}'", arg));
    }
    Ok((name.to_string(), FilterField::new(Identifier::parse(column), value_type)))
}

/// `InTransit=2`, `Region='North'`
fn parse_constant(arg: &str) -> Result<(String, Value), String> {
    match arg.split_once('=') {
        Some((name, literal)) if !name.is_empty() => {
            Ok((name.to_string(), Value::parse_literal(literal)))
        }
        _ => Err(format!("expected NAME=LITERAL, got '{}'", arg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input() {
        let catalog = demo_catalog();
        let cases = vec![
            DEMO_FILTER,
            "status eq Placed",
            "Status ge InPacking and Type eq Prime",
            "CreatedOnUtc lt now()",
            "year(CreatedOnUtc) eq 2024",
            "Offer eq null",
            "startswith(Address, 'Main') or endswith(Address, 'Street')",
            "(Type eq Standard) and (Status eq Delivered or Status eq InTransit)",
            "length(Description) gt 10",
            "not (status eq Placed or status eq InPacking)",
        ];

        for case in cases {
            let result = run(case, &catalog, false);
            assert!(result.is_ok(), "Failed to parse valid input {:?}: {:?}", case, result);
        }
    }

    #[test]
    fn test_invalid_input() {
        let catalog = demo_catalog();
        let cases = vec![
            "status eq Shipped",
            "Unknown eq 1",
            "status eq",
            "status",
            "(status eq Placed",
            "status eq Placed)",
            "status eq 'Placed",
            "status eq Placed and",
            "substring(CustomerName,,3) eq 'Jim'",
            "tolower(CustomerName) eq 'jim'",
        ];

        for case in cases {
            let result = run(case, &catalog, false);
            assert!(result.is_err(), "Expected parse to fail. Input: {}, Got: {:?}", case, result);
        }
    }

    #[test]
    fn test_demo_output() {
        let criteria = run(DEMO_FILTER, &demo_catalog(), false).unwrap();
        assert_eq!(
            criteria.render(Syntax::Sql),
            "(([Order].[Status] = @Filter0\r\n OR [Order].[Status] = @Filter1)\r\n AND SUBSTRING([Order].[CustomerName],@Filter2,@Filter3) = @Filter4)"
        );
        let lines: Vec<String> = criteria
            .all_parameters()
            .map(|p| format!("{}: {}", p.name, p.value))
            .collect();
        assert_eq!(lines, vec!["Filter0: 2", "Filter1: 3", "Filter2: 1", "Filter3: 3", "Filter4: Jim"]);
    }

    #[test]
    fn test_parse_field() {
        let (name, field) = parse_field("Status=Order.Status:integer").unwrap();
        assert_eq!(name, "Status");
        assert_eq!(field.identifier, Identifier::qualified("Order", "Status"));
        assert_eq!(field.value_type, ValueType::Integer);

        let (_, field) = parse_field("Offer=Name").unwrap();
        assert_eq!(field.identifier, Identifier::new("Name"));
        assert_eq!(field.value_type, ValueType::Unknown);

        for case in ["Status", "=Order.Status", "Status=Order.Status:blob"] {
            assert!(parse_field(case).is_err(), "Expected error for {:?}", case);
        }
    }

    #[test]
    fn test_parse_constant() {
        assert_eq!(parse_constant("InTransit=2").unwrap(), ("InTransit".to_string(), Value::Int(2)));
        assert_eq!(
            parse_constant("Region='North'").unwrap(),
            ("Region".to_string(), Value::String("North".to_string()))
        );
        assert!(parse_constant("=2").is_err());
    }
}
