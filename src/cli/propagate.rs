//! Command line interface for propagating a particle through a slab geometry.

use crate::geometry::{Point3, Vec3};
use crate::{exit_on_error, exit_on_false, exit_with_error};
use crate::navigation::slabs::{SlabGeometry3, SlabNavigator3};
use crate::navigation::Navigator3;
use crate::propagation::driver::uniform::{UniformFieldDriver3, UniformFieldDriverConfig};
use crate::propagation::options::FieldPropagatorOptions;
use crate::propagation::propagator::{FieldPropagator3, NextStepSearch};
use crate::propagation::fpr;
use clap::{Arg, ArgMatches, Command};
use std::{fmt, str::FromStr};

/// Builds a representation of the `propagate` command line subcommand.
pub fn create_propagate_subcommand() -> Command<'static> {
    let command = Command::new("propagate")
        .about("Propagate a charged particle through a nested slab geometry")
        .after_help(
            "The particle is repeatedly propagated to the next boundary (or over the\n\
             given step length), printing the travelled distance for each crossing.",
        )
        .arg(
            Arg::new("layer-half-widths")
                .long("layer-half-widths")
                .require_equals(true)
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .value_name("WIDTHS")
                .help("Half widths of the nested slab layers (comma-separated)")
                .takes_value(true)
                .multiple_values(true)
                .default_value("3,4,5,15,16,17,24"),
        )
        .arg(
            Arg::new("position")
                .long("position")
                .require_equals(true)
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .value_name("X,Y,Z")
                .help("Starting position of the particle")
                .takes_value(true)
                .multiple_values(true)
                .default_value("-10,-10,-10"),
        )
        .arg(
            Arg::new("direction")
                .long("direction")
                .require_equals(true)
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .value_name("X,Y,Z")
                .help("Starting direction of the particle (will be normalized)")
                .takes_value(true)
                .multiple_values(true)
                .default_value("1,0,0"),
        )
        .arg(
            Arg::new("momentum")
                .long("momentum")
                .require_equals(true)
                .value_name("VALUE")
                .help("Momentum magnitude of the particle")
                .takes_value(true)
                .default_value("1.0"),
        )
        .arg(
            Arg::new("charge")
                .long("charge")
                .require_equals(true)
                .value_name("VALUE")
                .help("Charge of the particle, in units of the elementary charge")
                .takes_value(true)
                .default_value("1.0"),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .require_equals(true)
                .use_value_delimiter(true)
                .require_value_delimiter(true)
                .value_name("BX,BY,BZ")
                .help("Uniform magnetic field vector")
                .takes_value(true)
                .multiple_values(true)
                .default_value("0,0,0"),
        )
        .arg(
            Arg::new("max-substep")
                .long("max-substep")
                .require_equals(true)
                .value_name("LENGTH")
                .help("Largest substep the driver advances in a single call")
                .takes_value(true)
                .default_value("0.5"),
        )
        .arg(
            Arg::new("step")
                .long("step")
                .require_equals(true)
                .value_name("LENGTH")
                .help("Step length to propagate over (propagates to the next boundary if omitted)")
                .takes_value(true),
        )
        .arg(
            Arg::new("crossings")
                .long("crossings")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Maximum number of propagation calls to perform")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::new("delta-intersection")
                .long("delta-intersection")
                .require_equals(true)
                .value_name("LENGTH")
                .help("Distance tolerance for accepting a boundary intercept")
                .takes_value(true),
        )
        .arg(
            Arg::new("minimum-substep")
                .long("minimum-substep")
                .require_equals(true)
                .value_name("LENGTH")
                .help("Smallest trial substep worth integrating")
                .takes_value(true),
        )
        .arg(
            Arg::new("max-substeps")
                .long("max-substeps")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Substep budget before a track is declared looping")
                .takes_value(true),
        )
        .arg(
            Arg::new("safety")
                .long("safety")
                .help("Amortize boundary queries with a conservative safety radius"),
        );

    #[cfg(feature = "json")]
    let command = command.arg(
        Arg::new("json")
            .long("json")
            .help("Print the propagation results as JSON"),
    );

    command
}

/// Runs the actions for the `propagate` subcommand using the given arguments.
pub fn run_propagate_subcommand(arguments: &ArgMatches) {
    let half_widths: Vec<fpr> = parse_list_argument(arguments, "layer-half-widths");
    let position = parse_point_argument(arguments, "position");
    let mut direction = parse_vector_argument(arguments, "direction");
    let field = parse_vector_argument(arguments, "field");
    let momentum: fpr = parse_argument(arguments, "momentum");
    let charge: fpr = parse_argument(arguments, "charge");
    let max_substep: fpr = parse_argument(arguments, "max-substep");
    let step: Option<fpr> = parse_optional_argument(arguments, "step");
    let crossings: u32 = parse_argument(arguments, "crossings");

    exit_on_false!(
        !direction.is_zero(),
        "Error: Direction must be a nonzero vector"
    );
    direction.normalize();

    let default_options = FieldPropagatorOptions::default();
    let options = FieldPropagatorOptions {
        delta_intersection: parse_optional_argument(arguments, "delta-intersection")
            .unwrap_or(default_options.delta_intersection),
        minimum_substep: parse_optional_argument(arguments, "minimum-substep")
            .unwrap_or(default_options.minimum_substep),
        max_substeps: parse_optional_argument(arguments, "max-substeps")
            .unwrap_or(default_options.max_substeps),
    };

    let search = if arguments.is_present("safety") {
        NextStepSearch::SafetyAmortized
    } else {
        NextStepSearch::Direct
    };

    let geometry = SlabGeometry3::nested(&half_widths);
    let mut geo = SlabNavigator3::new(&geometry, position, direction);
    let driver = UniformFieldDriver3::new(UniformFieldDriverConfig {
        field,
        charge,
        max_substep,
    });
    let mut propagator = FieldPropagator3::with_search(options, driver, momentum, &mut geo, search);

    let mut results = Vec::new();
    for crossing in 0..crossings {
        let result = match step {
            Some(step) => propagator.propagate(step),
            None => propagator.propagate_to_boundary(),
        };
        println!(
            "{:3}: distance = {:<12.6} boundary = {:<5} looping = {:<5} position = {}",
            crossing + 1,
            result.distance,
            result.boundary,
            result.looping,
            propagator.geometry().pos(),
        );
        let stop = !result.boundary || result.looping;
        results.push(result);
        if stop {
            break;
        }
    }

    #[cfg(feature = "json")]
    if arguments.is_present("json") {
        let serialized = exit_on_error!(
            serde_json::to_string_pretty(&results),
            "Error: Could not serialize results: {}"
        );
        println!("{}", serialized);
    }
}

fn parse_argument<T>(arguments: &ArgMatches, name: &str) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let value = arguments
        .value_of(name)
        .unwrap_or_else(|| exit_with_error!("Error: No value for required argument {}", name));
    exit_on_error!(
        value.parse(),
        "Error: Could not parse value of {}: {}",
        name
    )
}

fn parse_optional_argument<T>(arguments: &ArgMatches, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    arguments.value_of(name).map(|value| {
        exit_on_error!(
            value.parse(),
            "Error: Could not parse value of {}: {}",
            name
        )
    })
}

fn parse_list_argument<T>(arguments: &ArgMatches, name: &str) -> Vec<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    arguments
        .values_of(name)
        .unwrap_or_else(|| exit_with_error!("Error: No values for required argument {}", name))
        .map(|value| {
            exit_on_error!(
                value.parse(),
                "Error: Could not parse value of {}: {}",
                name
            )
        })
        .collect()
}

fn parse_three_components(arguments: &ArgMatches, name: &str) -> [fpr; 3] {
    let components: Vec<fpr> = parse_list_argument(arguments, name);
    if components.len() != 3 {
        exit_with_error!(
            "Error: Argument {} requires exactly three components",
            name
        );
    }
    [components[0], components[1], components[2]]
}

fn parse_point_argument(arguments: &ArgMatches, name: &str) -> Point3<fpr> {
    let [x, y, z] = parse_three_components(arguments, name);
    Point3::new(x, y, z)
}

fn parse_vector_argument(arguments: &ArgMatches, name: &str) -> Vec3<fpr> {
    let [x, y, z] = parse_three_components(arguments, name);
    Vec3::new(x, y, z)
}
