use serde_json::json;

use crate::cli::commands::PlantCommands;
use crate::db::{connection, plant_repo};
use crate::error::SproutError;
use crate::output;

pub fn run(cmd: PlantCommands, json_output: bool) -> i32 {
    let result = match cmd {
        PlantCommands::Add { name, species, location, notes } => run_add(
            &name,
            species.as_deref(),
            location.as_deref(),
            notes.as_deref(),
            json_output,
        ),
        PlantCommands::List => run_list(json_output),
        PlantCommands::Show { reference } => run_show(&reference, json_output),
        PlantCommands::Remove { reference } => run_remove(&reference, json_output),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&output::json::error(&e)).unwrap());
            } else {
                eprintln!("Error: {}", e.message);
            }
            1
        }
    }
}

fn run_add(
    name: &str,
    species: Option<&str>,
    location: Option<&str>,
    notes: Option<&str>,
    json_output: bool,
) -> Result<i32, SproutError> {
    if name.trim().is_empty() {
        return Err(SproutError::validation("Plant name is required"));
    }
    let conn = connection::open_db()?;
    let id = ulid::Ulid::new().to_string();
    let plant = plant_repo::create_plant(&conn, &id, name, species, location, notes)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::plant_json(&plant)))
                .unwrap()
        );
    } else {
        println!("Added plant: {} ({})", plant.name, plant.id);
    }
    Ok(0)
}

fn run_list(json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let plants = plant_repo::list_plants(&conn)?;

    if json_output {
        let plants_json: Vec<_> = plants.iter().map(output::json::plant_json).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({ "plants": plants_json })))
                .unwrap()
        );
    } else {
        output::text::print_plant_list(&plants);
    }
    Ok(0)
}

fn run_show(reference: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let plant = plant_repo::resolve_plant(&conn, reference)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(output::json::plant_json(&plant)))
                .unwrap()
        );
    } else {
        output::text::print_plant(&plant);
    }
    Ok(0)
}

fn run_remove(reference: &str, json_output: bool) -> Result<i32, SproutError> {
    let conn = connection::open_db()?;
    let plant = plant_repo::resolve_plant(&conn, reference)?;
    plant_repo::delete_plant(&conn, &plant.id)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "removed": { "id": plant.id, "name": plant.name }
            })))
            .unwrap()
        );
    } else {
        println!("Removed plant: {} ({})", plant.name, plant.id);
    }
    Ok(0)
}
