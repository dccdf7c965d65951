mod common;

use geochem_core::abundance::Abundance;
use geochem_core::assembler::{place, Placement, RowAssembler};
use geochem_core::catalog::{build_catalog, SchemaAccumulator};
use geochem_core::code_tables::key_records;
use geochem_core::config::{ProductConfig, RepeatPolicy};
use geochem_core::coordinates::{ReprojectionError, UtmCoordinate};
use geochem_core::model::{CoordConfidence, Sample};
use geochem_core::regions::RegionResolver;
use geochem_core::table::FixedColumn;

use common::{au, codes, normalizer, publication, records, sample};

#[test]
fn place_prefers_equal_value_then_first_empty() {
    let mut values = vec![Some(Abundance::Measured(4.0.into())), None, None];
    let slots = [0, 1, 2];

    assert_eq!(
        place(&mut values, &slots, &Abundance::Measured(4.0.into())),
        Placement::Redundant(0)
    );
    assert_eq!(
        place(&mut values, &slots, &Abundance::Measured(5.0.into())),
        Placement::Filled(1)
    );
    assert_eq!(
        place(&mut values, &slots, &Abundance::BelowDetectionLimit(5.0.into())),
        Placement::Filled(2)
    );
    assert_eq!(
        place(&mut values, &slots, &Abundance::Measured(6.0.into())),
        Placement::Conflict
    );
    assert_eq!(values[2], Some(Abundance::BelowDetectionLimit(5.0.into())));
}

#[test]
fn place_skips_blank_abundance() {
    let mut values = vec![None];
    assert_eq!(place(&mut values, &[0], &Abundance::Blank), Placement::Skipped);
    assert_eq!(values, vec![None]);
}

#[test]
fn assembles_fixed_columns_with_blanks_and_rounding() {
    let mut s = Sample {
        sample_name: Some("  TILL-01 ".to_string()),
        z: Some(812.5),
        coord_conf: Some(CoordConfidence::High),
        core_top: Some(1.5),
        ..sample(1)
    };
    s.borehole = None;
    let records = records(vec![s], vec![au(1, "12")], vec![publication(1, "GF 2001-1")]);
    let codes = codes();
    let keyed = key_records(&records, &codes).expect("known codes");
    let config = ProductConfig::default();
    let catalog = build_catalog(&keyed, &config);
    let normalizer = normalizer();
    let regions = RegionResolver::without_grid("");

    let row = RowAssembler::new(&catalog, &normalizer, &regions)
        .assemble(&keyed[0])
        .expect("row assembles");

    let fixed = |column: FixedColumn| row.fixed[column.index()].as_str();
    assert_eq!(row.fixed.len(), FixedColumn::ALL.len());
    assert_eq!(fixed(FixedColumn::SampleId), "1");
    assert_eq!(fixed(FixedColumn::SampleName), "TILL-01");
    assert_eq!(fixed(FixedColumn::Borehole), "");
    assert_eq!(fixed(FixedColumn::CoreTop), "1.5");
    assert_eq!(fixed(FixedColumn::CoreBottom), "");
    assert_eq!(fixed(FixedColumn::Elevation), "813");
    assert_eq!(fixed(FixedColumn::CoordConf), "high");
    assert_eq!(fixed(FixedColumn::Longitude), "-128");
    assert_eq!(fixed(FixedColumn::UtmZone), "9");
    assert_eq!(fixed(FixedColumn::Region), "");
    assert_eq!(row.publications, vec!["GF 2001-1".to_string()]);
    assert_eq!(row.values, vec![Some(Abundance::Measured(12.0.into()))]);
    assert!(!row.in_region_grid);
    assert!(row.conflicts.is_empty());
}

#[test]
fn truncates_projected_coordinates() {
    let records = records(vec![sample(1)], vec![], vec![]);
    let codes = codes();
    let keyed = key_records(&records, &codes).expect("known codes");
    let catalog = build_catalog(&keyed, &ProductConfig::default());
    let normalizer = normalizer();
    let regions = RegionResolver::without_grid("");

    let row = RowAssembler::new(&catalog, &normalizer, &regions)
        .assemble(&keyed[0])
        .expect("row assembles");

    // linear stand-in adds 0.75 / 0.25 m, which truncation drops
    assert_eq!(
        row.utm,
        UtmCoordinate {
            easting: 52_000,
            northing: 54_000,
            zone: 9,
        }
    );
}

#[test]
fn capped_key_reports_conflict_and_keeps_row() {
    let records = records(
        vec![sample(1)],
        vec![au(1, "10.2"), au(1, "10.0"), au(1, "9.8")],
        vec![],
    );
    let codes = codes();
    let keyed = key_records(&records, &codes).expect("known codes");
    let mut acc = SchemaAccumulator::new(2, RepeatPolicy::PerSample);
    acc.observe_sample(&keyed[0]);
    let catalog = acc.finish();
    let normalizer = normalizer();
    let regions = RegionResolver::without_grid("");

    let row = RowAssembler::new(&catalog, &normalizer, &regions)
        .assemble(&keyed[0])
        .expect("row assembles");

    assert_eq!(
        row.values,
        vec![
            Some(Abundance::Measured(10.2.into())),
            Some(Abundance::Measured(10.0.into())),
        ]
    );
    assert_eq!(row.conflicts.len(), 1);
    let conflict = &row.conflicts[0];
    assert_eq!(conflict.sample_id, 1);
    assert_eq!(conflict.sample_code.as_deref(), Some("S1"));
    assert_eq!(conflict.column, "Au_FA_ppb_63");
    assert_eq!(conflict.abundance, Abundance::Measured(9.8.into()));
    assert_eq!(conflict.slots, 2);
    assert_eq!(conflict.occupied.len(), 2);
}

#[test]
fn unsupported_reference_system_is_fatal() {
    let s = Sample {
        epsg: 2_000_000,
        ..sample(1)
    };
    let records = records(vec![s], vec![], vec![]);
    let codes = codes();
    let keyed = key_records(&records, &codes).expect("known codes");
    let catalog = build_catalog(&keyed, &ProductConfig::default());
    let normalizer = normalizer();
    let regions = RegionResolver::without_grid("");

    let err = RowAssembler::new(&catalog, &normalizer, &regions)
        .assemble(&keyed[0])
        .expect_err("unknown system");

    assert!(matches!(
        err,
        ReprojectionError::UnsupportedCrs { epsg: 2_000_000 }
    ));
}
