//! A fleet log: nested records, enumerations, polymorphic parts and collections together.

use std::collections::BTreeMap;

use indoc::indoc;
use serde::Deserialize;
use serde_dsv::{Describe, Field, Options, Schema, Variant, from_str_with_options, options};

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
enum VehicleType {
    Car,
    Motorbike,
}

impl Describe for VehicleType {
    fn describe() -> Schema {
        Schema::enumeration("VehicleType", ["CAR", "MOTORBIKE"])
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
struct Vehicle {
    uuid: String,
    #[serde(rename = "type")]
    kind: VehicleType,
    brand: String,
}

impl Describe for Vehicle {
    fn describe() -> Schema {
        Schema::record(
            "Vehicle",
            vec![
                Field::new("uuid", String::describe()),
                Field::new("type", VehicleType::describe()),
                Field::new("brand", String::describe()),
            ],
        )
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
enum Axis {
    Front,
    Rear,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Deserialize, PartialEq)]
enum Part {
    Tire {
        axis: Axis,
        side: Side,
        width: u16,
        ratio: u8,
        diameter: u8,
    },
    Oil {
        viscosity: u8,
        volume: u8,
    },
}

impl Describe for Part {
    fn describe() -> Schema {
        let tire = Schema::record(
            "Tire",
            vec![
                Field::new("axis", Schema::enumeration("Axis", ["FRONT", "REAR"])),
                Field::new("side", Schema::enumeration("Side", ["LEFT", "RIGHT"])),
                Field::new("width", u16::describe()),
                Field::new("ratio", u8::describe()),
                Field::new("diameter", u8::describe()),
            ],
        );
        let oil = Schema::record(
            "Oil",
            vec![
                Field::new("viscosity", u8::describe()),
                Field::new("volume", u8::describe()),
            ],
        );
        Schema::tagged_union("Part", vec![Variant::new("Tire", tire), Variant::new("Oil", oil)])
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct VehiclePartRecord {
    id: u32,
    vehicle: Vehicle,
    part: Part,
    storage_cost: f64,
}

impl Describe for VehiclePartRecord {
    fn describe() -> Schema {
        Schema::record(
            "VehiclePartRecord",
            vec![
                Field::new("id", u32::describe()),
                Field::new("vehicle", Vehicle::describe()),
                Field::new("part", Part::describe()),
                Field::new("storage_cost", f64::describe()),
            ],
        )
    }
}

fn tesla() -> Vehicle {
    Vehicle {
        uuid: "f9682dcb-30f7-4e88-915e-60e3b2758da7".into(),
        kind: VehicleType::Car,
        brand: "Tesla".into(),
    }
}

fn porsche() -> Vehicle {
    Vehicle {
        uuid: "5e1afd88-97a2-4373-a83c-44a49c552abd".into(),
        kind: VehicleType::Car,
        brand: "Porsche".into(),
    }
}

#[test]
fn vehicle_parts_without_headers() {
    let text = indoc! {"
        101,f9682dcb-30f7-4e88-915e-60e3b2758da7,CAR,Tesla,Tire,FRONT,LEFT,245,35,21,0.25\r
        104,f9682dcb-30f7-4e88-915e-60e3b2758da7,CAR,Tesla,Tire,REAR,RIGHT,265,35,21,0.32\r
        201,5e1afd88-97a2-4373-a83c-44a49c552abd,CAR,Porsche,Oil,20,50,0.2\r
    "};
    let rows: Vec<VehiclePartRecord> = from_str_with_options(text, Options::rfc4180()).unwrap();
    assert_eq!(
        rows,
        vec![
            VehiclePartRecord {
                id: 101,
                vehicle: tesla(),
                part: Part::Tire {
                    axis: Axis::Front,
                    side: Side::Left,
                    width: 245,
                    ratio: 35,
                    diameter: 21,
                },
                storage_cost: 0.25,
            },
            VehiclePartRecord {
                id: 104,
                vehicle: tesla(),
                part: Part::Tire {
                    axis: Axis::Rear,
                    side: Side::Right,
                    width: 265,
                    ratio: 35,
                    diameter: 21,
                },
                storage_cost: 0.32,
            },
            VehiclePartRecord {
                id: 201,
                vehicle: porsche(),
                part: Part::Oil {
                    viscosity: 20,
                    volume: 50,
                },
                storage_cost: 0.2,
            },
        ]
    );
}

#[derive(Debug, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum Feature {
    Electric,
    Automatic,
    HeatedSeats,
    NavigationSystem,
    Xenon,
}

impl Describe for Feature {
    fn describe() -> Schema {
        Schema::enumeration(
            "Feature",
            ["ELECTRIC", "AUTOMATIC", "HEATED_SEATS", "NAVIGATION_SYSTEM", "XENON"],
        )
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct VehicleFeaturesRecord {
    vehicle: Vehicle,
    features: Option<Vec<Feature>>,
    options: Option<BTreeMap<Feature, u32>>,
}

impl Describe for VehicleFeaturesRecord {
    fn describe() -> Schema {
        Schema::record(
            "VehicleFeaturesRecord",
            vec![
                Field::new("vehicle", Vehicle::describe()),
                Field::new("features", Option::<Vec<Feature>>::describe()),
                Field::new("options", Option::<BTreeMap<Feature, u32>>::describe()),
            ],
        )
    }
}

#[test]
fn vehicle_features_with_collections() {
    let text = indoc! {"
        c038c27b-a3fd-4e35-b6ac-ab06d747e16c,MOTORBIKE,Harley,,
        c038c27b-a3fd-4e35-b6ac-ab06d747e16c,MOTORBIKE,Harley,0,0
        f9682dcb-30f7-4e88-915e-60e3b2758da7,CAR,Tesla,5,ELECTRIC,AUTOMATIC,HEATED_SEATS,NAVIGATION_SYSTEM,XENON,2,ELECTRIC,0,XENON,1
    "};
    let rows: Vec<VehicleFeaturesRecord> = from_str_with_options(text, Options::rfc4180()).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].vehicle.kind, VehicleType::Motorbike);
    assert_eq!(rows[0].features, None);
    assert_eq!(rows[0].options, None);
    assert_eq!(rows[1].features, Some(vec![]));
    assert_eq!(rows[1].options, Some(BTreeMap::new()));
    assert_eq!(rows[2].vehicle, tesla());
    assert_eq!(
        rows[2].features,
        Some(vec![
            Feature::Electric,
            Feature::Automatic,
            Feature::HeatedSeats,
            Feature::NavigationSystem,
            Feature::Xenon,
        ])
    );
    assert_eq!(
        rows[2].options,
        Some(BTreeMap::from([(Feature::Electric, 0), (Feature::Xenon, 1)]))
    );
}

#[derive(Debug, Deserialize, PartialEq)]
struct Position {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Person {
    id: u32,
    #[serde(rename = "foreName")]
    fore_name: String,
    #[serde(rename = "lastName")]
    last_name: String,
    birthday: Option<i64>,
}

#[derive(Debug, Deserialize, PartialEq)]
enum Consumption {
    Unknown,
    Combustion {
        #[serde(rename = "consumptionLiterPer100Km")]
        liters_per_100km: f64,
    },
    Electric {
        #[serde(rename = "consumptionKWhPer100Km")]
        kwh_per_100km: f64,
    },
}

impl Describe for Consumption {
    fn describe() -> Schema {
        Schema::tagged_union(
            "Consumption",
            vec![
                Variant::new("Unknown", Schema::singleton("Unknown")),
                Variant::new(
                    "Combustion",
                    Schema::record(
                        "Combustion",
                        vec![Field::new("consumptionLiterPer100Km", f64::describe())],
                    ),
                ),
                Variant::new(
                    "Electric",
                    Schema::record(
                        "Electric",
                        vec![Field::new("consumptionKWhPer100Km", f64::describe())],
                    ),
                ),
            ],
        )
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct VehicleData {
    speed: Option<f64>,
    consumption: Consumption,
}

#[derive(Debug, Deserialize, PartialEq)]
struct LocationRecord {
    id: u32,
    position: Position,
    driver: Person,
    vehicle: Vehicle,
    #[serde(rename = "vehicleData")]
    vehicle_data: VehicleData,
}

impl Describe for LocationRecord {
    fn describe() -> Schema {
        let position = Schema::record(
            "Position",
            vec![
                Field::new("latitude", f64::describe()),
                Field::new("longitude", f64::describe()),
            ],
        );
        let person = Schema::record(
            "Person",
            vec![
                Field::new("id", u32::describe()),
                Field::new("foreName", String::describe()),
                Field::new("lastName", String::describe()),
                Field::new("birthday", Option::<i64>::describe()),
            ],
        );
        let vehicle_data = Schema::record(
            "VehicleData",
            vec![
                Field::new("speed", Option::<f64>::describe()),
                Field::new("consumption", Consumption::describe()),
            ],
        );
        Schema::record(
            "LocationRecord",
            vec![
                Field::new("id", u32::describe()),
                Field::new("position", position),
                Field::new("driver", person),
                Field::new("vehicle", Vehicle::describe()),
                Field::new("vehicleData", vehicle_data),
            ],
        )
    }
}

#[test]
fn location_records_with_dotted_headers() {
    let text = indoc! {"
        id,date,position.latitude,position.longitude,driver.id,driver.foreName,driver.lastName,driver.birthday,vehicle.uuid,vehicle.type,vehicle.brand,vehicleData.speed,vehicleData.consumption,vehicleData.consumption.Unknown,vehicleData.consumption.Combustion.consumptionLiterPer100Km,vehicleData.consumption.Electric.consumptionKWhPer100Km\r
        0,2020-02-01T13:33:00,0.0,0.0,12,Jon,Smith,,f9682dcb-30f7-4e88-915e-60e3b2758da7,CAR,Tesla,,Unknown,Unknown,,\r
        1,2020-02-01T13:37:00,0.1,0.1,12,Jon,Smith,,f9682dcb-30f7-4e88-915e-60e3b2758da7,CAR,Tesla,27.7778,Electric,,,18.1\r
        9000,2020-02-05T07:59:00,48.137154,11.576124,42,Jane,Doe,1581602631744,c038c27b-a3fd-4e35-b6ac-ab06d747e16c,MOTORBIKE,Harley,20.0,Combustion,,7.9,\r
    "};
    let options = Options {
        has_header_record: true,
        ..Options::rfc4180()
    };
    let rows: Vec<LocationRecord> = from_str_with_options(text, options).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].id, 0);
    assert_eq!(rows[0].driver.fore_name, "Jon");
    assert_eq!(rows[0].driver.birthday, None);
    assert_eq!(rows[0].vehicle, tesla());
    assert_eq!(
        rows[0].vehicle_data,
        VehicleData {
            speed: None,
            consumption: Consumption::Unknown,
        }
    );
    assert_eq!(
        rows[1].vehicle_data,
        VehicleData {
            speed: Some(27.7778),
            consumption: Consumption::Electric { kwh_per_100km: 18.1 },
        }
    );
    assert_eq!(
        rows[2].position,
        Position {
            latitude: 48.137154,
            longitude: 11.576124,
        }
    );
    assert_eq!(rows[2].driver.birthday, Some(1581602631744));
    assert_eq!(rows[2].vehicle.kind, VehicleType::Motorbike);
    assert_eq!(
        rows[2].vehicle_data,
        VehicleData {
            speed: Some(20.0),
            consumption: Consumption::Combustion { liters_per_100km: 7.9 },
        }
    );
}

#[test]
fn location_record_error_reports_crlf_line() {
    let text = indoc! {"
        id,vehicleData.speed,vehicleData.consumption,vehicleData.consumption.Electric.consumptionKWhPer100Km\r
        1,,Electric,18.1\r
        2,,Electric,lots\r
    "};
    let options = Options {
        has_header_record: true,
        ..Options::rfc4180()
    };
    let err = from_str_with_options::<Vec<LocationRecord>>(text, options).unwrap_err();
    assert!(matches!(err, serde_dsv::Error::ValueFormat { .. }), "{err:?}");
    assert_eq!(err.location().map(|l| (l.line(), l.column())), Some((3, 4)));
}
