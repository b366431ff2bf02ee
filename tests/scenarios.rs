use abel::{
    AbelError, Context, DiscoveredPoint, DiscoveryPayload, DiscoveryRecord, EntityFieldRow, GuidStrategy, Loadsheet,
    LoadsheetRecord, Options, PriorConfig, Report, convert, convert_with,
};
use std::collections::HashSet;

fn row(device: &str, asset: &str, field: &str, object: (&str, &str)) -> LoadsheetRecord {
    let general_type = asset.split('-').next().unwrap_or(asset).to_string();
    LoadsheetRecord {
        required: "YES".into(),
        is_missing: "NO".into(),
        building: "B".into(),
        type_name: format!("{general_type}_SD"),
        full_asset_path: format!("B:{general_type}:{asset}"),
        general_type,
        asset_name: asset.into(),
        standard_field_name: field.into(),
        device_id: device.into(),
        object_type: object.0.into(),
        object_id: object.1.into(),
        point_type: object.0.into(),
        ..LoadsheetRecord::default()
    }
}

fn device(id: &str, code: &str, points: &[(&str, DiscoveredPoint)]) -> DiscoveryRecord {
    DiscoveryRecord {
        cloud_device_id: Some(format!("cloud-{code}")),
        entity_code: Some(code.into()),
        entity_guid: Some(format!("guid-{code}")),
        building: Some("B".into()),
        building_guid: Some("guid-site".into()),
        device_id: Some(id.into()),
        data: points.iter().map(|(k, p)| (k.to_string(), p.clone())).collect(),
    }
}

fn units(u: &str) -> DiscoveredPoint {
    DiscoveredPoint { units: Some(u.into()), ..DiscoveredPoint::default() }
}

fn field<'a>(report: &'a Report, label: &str) -> &'a EntityFieldRow {
    report
        .entity_fields
        .iter()
        .find(|f| f.reporting_entity_field == label)
        .unwrap_or_else(|| panic!("no field labelled {label}"))
}

fn shared_device_sheet() -> Loadsheet {
    Loadsheet::new(vec![
        row("DEV:2", "VAV-1", "zone_air_temperature_sensor", ("AI", "7")),
        row("DEV:2", "VAV-2", "zone_air_temperature_sensor", ("AI", "3")),
        row("DEV:2", "VAV-2", "supply_air_damper_percentage_command", ("AO", "4")),
    ])
}

fn shared_device_payload() -> DiscoveryPayload {
    DiscoveryPayload::new(vec![device(
        "bacnet:2",
        "CTRL-2",
        &[
            ("analog-input_7", units("degrees-fahrenheit")),
            ("analog-input_3", units("degrees-fahrenheit")),
            ("analog-output_4", units("percent")),
        ],
    )])
}

#[test]
fn one_to_one_device_and_asset_is_a_direct_entity() {
    let sheet = Loadsheet::new(vec![
        row("DEV:1", "AHU-1", "supply_air_temperature_sensor", ("AI", "1")),
        row("DEV:1", "AHU-1", "supply_fan_run_command", ("BO", "2")),
    ]);
    let payload = DiscoveryPayload::new(vec![device("DEV:1", "AHU-1", &[("analog-input_1", units("degrees-fahrenheit"))])]);

    let report = convert(&sheet, &payload, None).unwrap();

    assert_eq!(report.entities.len(), 1);
    let entity = &report.entities[0];
    assert!(entity.is_reporting);
    assert_eq!(entity.entity_code, "AHU-1");
    assert_eq!(entity.entity_guid, "guid-AHU-1");
    assert_eq!(entity.namespace, "HVAC");
    assert_eq!(entity.general_type, "AHU");
    assert!(report.entity_fields.iter().all(|f| f.entity_code == "AHU-1" && f.reporting_entity_code == "AHU-1"));
    assert_eq!(report.site[0].entity_guid, "guid-site");
}

#[test]
fn device_shared_by_two_assets_is_a_passthrough_with_virtual_entities() {
    let report = convert(&shared_device_sheet(), &shared_device_payload(), None).unwrap();

    let summary: Vec<(&str, bool, &str)> =
        report.entities.iter().map(|e| (e.entity_code.as_str(), e.is_reporting, e.namespace.as_str())).collect();
    assert_eq!(
        summary,
        vec![("CTRL-2", true, "GATEWAYS"), ("B:VAV:VAV-1", false, "HVAC"), ("B:VAV:VAV-2", false, "HVAC")]
    );
    assert_eq!(report.entities[0].entity_type_name, "PASSTHROUGH");

    let damper = field(&report, "supply_air_damper_percentage_command");
    assert_eq!(damper.entity_code, "B:VAV:VAV-2");
    assert_eq!(damper.entity_guid, report.entities[2].entity_guid);
    assert_eq!(damper.reporting_entity_code, "CTRL-2");
    assert_eq!(damper.reporting_entity_guid, "guid-CTRL-2");
}

#[test]
fn repeated_fields_in_one_reporting_scope_are_enumerated_by_raw_name() {
    let report = convert(&shared_device_sheet(), &shared_device_payload(), None).unwrap();

    let first = field(&report, "zone_air_temperature_sensor_1");
    let second = field(&report, "zone_air_temperature_sensor_2");
    assert_eq!(first.raw_field_name, "data.analog-input_3.present-value");
    assert_eq!(first.entity_code, "B:VAV:VAV-2");
    assert_eq!(second.raw_field_name, "data.analog-input_7.present-value");
    assert_eq!(second.entity_code, "B:VAV:VAV-1");
    assert!(report.entity_fields.iter().all(|f| f.reporting_entity_field != "zone_air_temperature_sensor"));
}

#[test]
fn repeated_field_on_one_asset_is_enumerated_by_raw_name() {
    let sheet = Loadsheet::new(vec![
        row("DEV:1", "AHU-1", "zone_air_temperature_sensor", ("AI", "2")),
        row("DEV:1", "AHU-1", "zone_air_temperature_sensor", ("AI", "1")),
    ]);
    let payload = DiscoveryPayload::new(vec![device(
        "DEV:1",
        "AHU-1",
        &[("analog-input_1", units("degrees-fahrenheit")), ("analog-input_2", units("degrees-fahrenheit"))],
    )]);

    let report = convert(&sheet, &payload, None).unwrap();

    assert_eq!(report.entities.len(), 1);
    assert_eq!(field(&report, "zone_air_temperature_sensor_1").raw_field_name, "data.analog-input_1.present-value");
    assert_eq!(field(&report, "zone_air_temperature_sensor_2").raw_field_name, "data.analog-input_2.present-value");
    assert!(report.entity_fields.iter().all(|f| f.entity_code == "AHU-1"));
    assert!(report.log.iter().any(|l| l.message.contains("declares 'zone_air_temperature_sensor' on more than one row")));
}

#[test]
fn declared_suffixed_field_is_not_reused_as_a_rank() {
    let sheet = Loadsheet::new(vec![
        row("DEV:2", "VAV-1", "zone_air_temperature_sensor", ("AI", "1")),
        row("DEV:2", "VAV-2", "zone_air_temperature_sensor", ("AI", "2")),
        row("DEV:2", "VAV-3", "zone_air_temperature_sensor_1", ("AI", "3")),
    ]);

    let report = convert(&sheet, &shared_device_payload(), None).unwrap();

    assert_eq!(field(&report, "zone_air_temperature_sensor_1").entity_code, "B:VAV:VAV-3");
    assert_eq!(field(&report, "zone_air_temperature_sensor_2").entity_code, "B:VAV:VAV-1");
    assert_eq!(field(&report, "zone_air_temperature_sensor_3").entity_code, "B:VAV:VAV-2");
}

#[test]
fn mismatched_units_are_flagged_and_declared_units_kept() {
    let mut zone = row("DEV:1", "AHU-1", "zone_air_temperature_sensor", ("AI", "1"));
    zone.units = "degrees_fahrenheit".into();
    zone.control_program = "CP-1".into();
    zone.object_name = "ZN-T".into();
    let payload = DiscoveryPayload::new(vec![device("DEV:1", "AHU-1", &[("analog-input_1", units("degrees-celsius"))])]);

    let report = convert(&Loadsheet::new(vec![zone]), &payload, None).unwrap();

    let zone = field(&report, "zone_air_temperature_sensor");
    assert!(zone.units_mismatch);
    assert_eq!(zone.standard_unit_value, "degrees_fahrenheit");
    assert_eq!(zone.raw_unit_value, "degrees-fahrenheit");
    assert_eq!(report.incorrect_units.len(), 1);
    assert_eq!(report.incorrect_units[0].current_units, "degrees-celsius");
    assert_eq!(report.incorrect_units[0].correct_units, "degrees_fahrenheit");
    assert_eq!(report.incorrect_units[0].object_id, "AI:1");
}

#[test]
fn device_missing_from_discovery_is_logged_with_placeholders() {
    let sheet = Loadsheet::new(vec![
        row("DEV:1", "AHU-1", "supply_air_temperature_sensor", ("AI", "1")),
        row("DEV:9", "FCU-9", "zone_air_temperature_sensor", ("AI", "1")),
    ]);
    let payload = DiscoveryPayload::new(vec![device("DEV:1", "AHU-1", &[("analog-input_1", units("degrees-fahrenheit"))])]);

    let report = convert(&sheet, &payload, None).unwrap();

    let messages: Vec<&str> = report.log.iter().map(|l| l.message.as_str()).collect();
    assert!(messages.contains(&"Required device is missing in discovery: DEV:9"), "{messages:?}");

    let missing = report.entities.iter().find(|e| e.entity_code == "MISSING CODE: DEV:9").unwrap();
    assert_eq!(missing.entity_guid, "MISSING GUID: DEV:9");
    assert_eq!(missing.cloud_device_id, "MISSING ID: DEV:9");

    let zone = field(&report, "zone_air_temperature_sensor");
    assert_eq!(zone.reporting_entity_guid, "MISSING GUID: DEV:9");
    assert_eq!(report.entities.len(), 2);
}

#[test]
fn identical_inputs_produce_identical_reports() {
    let first = convert(&shared_device_sheet(), &shared_device_payload(), None).unwrap().to_json().unwrap();
    let second = convert(&shared_device_sheet(), &shared_device_payload(), None).unwrap().to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn reporting_fields_and_codes_are_unique() {
    let mut records = shared_device_sheet().records;
    records.push(row("DEV:2", "VAV-3", "zone_air_temperature_sensor", ("AI", "11")));
    records.push(LoadsheetRecord {
        is_missing: "YES".into(),
        device_id: String::new(),
        object_type: String::new(),
        object_id: String::new(),
        ..row("", "VAV-3", "zone_air_damper_percentage_command", ("", ""))
    });
    let report = convert(&Loadsheet::new(records), &shared_device_payload(), None).unwrap();

    let mut pairs = HashSet::new();
    for f in &report.entity_fields {
        assert!(pairs.insert((f.reporting_entity_guid.clone(), f.reporting_entity_field.clone())), "{f:?}");
    }
    let codes: HashSet<&str> = report.entities.iter().map(|e| e.entity_code.as_str()).collect();
    assert_eq!(codes.len(), report.entities.len());

    // Every virtual entity has at least one field.
    for entity in report.entities.iter().filter(|e| !e.is_reporting) {
        assert!(report.entity_fields.iter().any(|f| f.entity_guid == entity.entity_guid), "{entity:?}");
    }
}

#[test]
fn prior_configuration_keeps_published_virtual_identity() {
    let random = Options { guids: GuidStrategy::Random, ..Options::default() };
    let sheet = shared_device_sheet();
    let payload = shared_device_payload();
    let prior = PriorConfig::from_yaml(
        "published-vav-1:\n  code: B:VAV:VAV-1\n  etag: \"1701\"\n  links:\n    guid-CTRL-2:\n      zone_air_temperature_sensor: zone_air_temperature_sensor_2\n\
         guid-CTRL-2:\n  etag: 99\n",
    )
    .unwrap();

    let first = convert_with(&sheet, &payload, Some(&prior), &Context::default(), &random).unwrap();
    let second = convert_with(&sheet, &payload, Some(&prior), &Context::default(), &random).unwrap();

    for report in [&first, &second] {
        let vav = report.entities.iter().find(|e| e.entity_code == "B:VAV:VAV-1").unwrap();
        assert_eq!(vav.entity_guid, "published-vav-1");
        assert_eq!(vav.etag, "1701");
        assert!(vav.is_existing);
        assert_eq!(field(report, "zone_air_temperature_sensor_2").entity_guid, "published-vav-1");

        let gateway = &report.entities[0];
        assert_eq!(gateway.etag, "99");
        assert!(gateway.is_existing);

        assert_eq!(report.existing_virtual_entities.len(), 1);
        assert_eq!(report.existing_virtual_entities[0].guid, "published-vav-1");
    }

    let fresh = |r: &Report| r.entities.iter().find(|e| e.entity_code == "B:VAV:VAV-2").map(|e| e.entity_guid.clone());
    assert_ne!(fresh(&first), fresh(&second));
}

#[test]
fn derived_guids_are_stable_without_prior() {
    let a = convert(&shared_device_sheet(), &shared_device_payload(), None).unwrap();
    let b = convert(&shared_device_sheet(), &shared_device_payload(), None).unwrap();
    let guids = |r: &Report| r.entities.iter().map(|e| e.entity_guid.clone()).collect::<Vec<_>>();
    assert_eq!(guids(&a), guids(&b));
    assert!(a.entities.iter().filter(|e| !e.is_reporting).all(|e| !e.is_existing && e.etag.is_empty()));
}

#[test]
fn loadsheet_json_with_missing_column_is_rejected() {
    let text = r#"[{"deviceId": "DEV:1", "standardFieldName": "zone_air_temperature_sensor"}]"#;
    match Loadsheet::from_json(text) {
        Err(AbelError::MissingColumns { row, columns }) => {
            assert_eq!(row, 1);
            assert!(columns.contains(&"fullAssetPath".to_string()));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn structural_failures_produce_no_report() {
    let mut bad = row("DEV:1", "AHU-1", "supply_air_temperature_sensor", ("AI", "1"));
    bad.required = "maybe".into();
    let err = convert(&Loadsheet::new(vec![bad]), &DiscoveryPayload::default(), None).unwrap_err();
    assert!(matches!(err, AbelError::InvalidRequiredFlag { row: 1, .. }));
}
