use super::*;

const ESRI_WGS84: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

const ESRI_UTM33N: &str = r#"PROJCS["WGS_1984_UTM_Zone_33N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",15.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

const OGC_NZTM: &str = r#"PROJCS["NZGD2000 / New Zealand Transverse Mercator 2000",
    GEOGCS["NZGD2000",
        DATUM["New_Zealand_Geodetic_Datum_2000",
            SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]]],
        PRIMEM["Greenwich",0],
        UNIT["degree",0.0174532925199433]],
    PROJECTION["Transverse_Mercator"],
    PARAMETER["latitude_of_origin",0],
    PARAMETER["central_meridian",173],
    PARAMETER["scale_factor",0.9996],
    PARAMETER["false_easting",1600000],
    PARAMETER["false_northing",10000000],
    UNIT["metre",1],
    AUTHORITY["EPSG","2193"]]"#;

const WKT2_UTM32N: &str = r#"PROJCRS["ETRS89 / UTM zone 32N",
    BASEGEOGCRS["ETRS89",
        DATUM["European Terrestrial Reference System 1989",
            ELLIPSOID["GRS 1980",6378137,298.257222101,LENGTHUNIT["metre",1]]],
        PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]]],
    CONVERSION["UTM zone 32N",
        METHOD["Transverse Mercator",ID["EPSG",9807]],
        PARAMETER["Latitude of natural origin",0,ANGLEUNIT["degree",0.0174532925199433]],
        PARAMETER["Longitude of natural origin",9,ANGLEUNIT["degree",0.0174532925199433]],
        PARAMETER["Scale factor at natural origin",0.9996,SCALEUNIT["unity",1]],
        PARAMETER["False easting",500000,LENGTHUNIT["metre",1]],
        PARAMETER["False northing",0,LENGTHUNIT["metre",1]]],
    CS[Cartesian,2],
        AXIS["(E)",east,ORDER[1],LENGTHUNIT["metre",1]],
        AXIS["(N)",north,ORDER[2],LENGTHUNIT["metre",1]],
    ID["EPSG",25832]]"#;

#[test]
fn esri_geographic_is_identified_by_name() {
    let r = SpatialReference::from_wkt(ESRI_WGS84).unwrap();
    assert_eq!(r.epsg(), Some(4326));
    assert_eq!(r.definition(), Some(ESRI_WGS84));
    assert_eq!(r.to_string(), "EPSG:4326");
}

#[test]
fn esri_utm_is_identified_by_name() {
    let r = SpatialReference::from_wkt(ESRI_UTM33N).unwrap();
    assert_eq!(r.epsg(), Some(32633));
}

#[test]
fn authority_clause_wins_over_name() {
    let r = SpatialReference::from_wkt(OGC_NZTM).unwrap();
    assert_eq!(r.epsg(), Some(2193));
    let wkt2 = SpatialReference::from_wkt(WKT2_UTM32N).unwrap();
    assert_eq!(wkt2.epsg(), Some(25832));
}

#[test]
fn code_outside_table_resolves_from_wkt() {
    let r = SpatialReference::from_wkt(OGC_NZTM).unwrap();
    let def = r.resolve().unwrap();
    assert_eq!(
        def.projection,
        Projection::TransverseMercator {
            lon0: 173.0,
            lat0: 0.0,
            k0: 0.9996,
            false_easting: 1_600_000.0,
            false_northing: 10_000_000.0,
        }
    );
    assert_eq!(def.ellipsoid, Ellipsoid::GRS80);
    assert_eq!(
        def.datum,
        Datum::Other("new_zealand_geodetic_datum_2000".to_string())
    );
}

#[test]
fn wkt2_parameters_are_read_from_conversion() {
    let root = wkt::parse(WKT2_UTM32N).unwrap();
    let def = wkt::to_definition(&root).unwrap();
    assert_eq!(def.datum, Datum::Wgs84Compatible);
    match def.projection {
        Projection::TransverseMercator {
            lon0,
            k0,
            false_easting,
            ..
        } => {
            assert_eq!(lon0, 9.0);
            assert_eq!(k0, 0.9996);
            assert_eq!(false_easting, 500_000.0);
        }
        other => panic!("expected transverse mercator, got {other:?}"),
    }
}

#[test]
fn us_feet_parameters_are_converted_to_metres() {
    let text = r#"PROJCS["custom_feet",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",1000.0],PARAMETER["Central_Meridian",-81.0],PARAMETER["Scale_Factor",0.9999],PARAMETER["Latitude_Of_Origin",24.0],UNIT["Foot_US",0.3048006096012192]]"#;
    let r = SpatialReference::from_wkt(text).unwrap();
    assert_eq!(r.epsg(), None);
    let def = r.resolve().unwrap();
    assert!((def.linear_unit - 0.3048006096012192).abs() < 1e-15);
    match def.projection {
        Projection::TransverseMercator {
            false_easting,
            lat0,
            ..
        } => {
            assert!((false_easting - 304.8006096012192).abs() < 1e-9);
            assert_eq!(lat0, 24.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn web_mercator_auxiliary_sphere() {
    let text = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#;
    let r = SpatialReference::from_wkt(text).unwrap();
    assert_eq!(r.epsg(), Some(3857));
    let root = wkt::parse(text).unwrap();
    assert_eq!(
        wkt::to_definition(&root).unwrap().projection,
        Projection::WebMercator
    );
}

const MERCATOR_2SP: &str = r#"PROJCS["WGS_1984_Mercator_SP45",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",45.0],UNIT["Meter",1.0]]"#;

#[test]
fn mercator_standard_parallel_sets_the_scale() {
    let def = SpatialReference::from_wkt(MERCATOR_2SP).unwrap().resolve().unwrap();
    let e2 = def.ellipsoid.e().powi(2);
    let phi = 45f64.to_radians();
    let expected = phi.cos() / (1.0 - e2 * phi.sin().powi(2)).sqrt();
    match def.projection {
        Projection::Mercator { k0, .. } => {
            assert!((k0 - expected).abs() < 1e-12);
            assert!((k0 - 0.708_293_170_693_72).abs() < 1e-12);
        }
        other => panic!("unexpected {other:?}"),
    }

    let on_equator = MERCATOR_2SP.replace("45.0]", "0.0],PARAMETER[\"Scale_Factor\",0.5]");
    let def = SpatialReference::from_wkt(&on_equator).unwrap().resolve().unwrap();
    assert!(matches!(def.projection, Projection::Mercator { k0, .. } if k0 == 0.5));
}

#[test]
fn unknown_projection_method_is_reported() {
    let text = r#"PROJCS["Lambert",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Lambert_Conformal_Conic"],UNIT["Meter",1.0]]"#;
    let r = SpatialReference::from_wkt(text).unwrap();
    assert_eq!(r.epsg(), None);
    match r.resolve() {
        Err(ResolveError::Unsupported(why)) => assert!(why.contains("lambert_conformal_conic")),
        other => panic!("expected unsupported, got {other:?}"),
    }
}

#[test]
fn malformed_wkt_reports_offset() {
    let err = SpatialReference::from_wkt(r#"GEOGCS["broken",DATUM["x""#).unwrap_err();
    assert!(err.offset > 0);
    assert!(wkt::parse("not wkt at all").is_err());
    assert!(wkt::parse(r#"GEOGCS["a"] trailing"#).is_err());
}

#[test]
fn doubled_quotes_and_parentheses() {
    let root = wkt::parse(r#"LOCAL_CS("say ""hi""", AXIS("x", EAST))"#).unwrap();
    assert_eq!(root.name(), Some(r#"say "hi""#));
    let axis = root.child(&["axis"]).unwrap();
    assert_eq!(axis.args[1], WktValue::Keyword("EAST".to_string()));
}

#[test]
fn geographic_name_does_not_identify_projected_crs() {
    let text = r#"PROJCS["WGS 84",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Transverse_Mercator"]]"#;
    let r = SpatialReference::from_wkt(text).unwrap();
    assert_eq!(r.epsg(), None);
}

#[test]
fn same_as_compares_codes_then_definitions() {
    let a = SpatialReference::from_epsg(4326);
    let b = SpatialReference::from_wkt(ESRI_WGS84).unwrap();
    assert!(a.same_as(&b));
    assert!(!a.same_as(&SpatialReference::from_epsg(3857)));
    let text = r#"GEOGCS["mystery",DATUM["d",SPHEROID["s",6378000,300]]]"#;
    let c = SpatialReference::from_wkt(text).unwrap();
    assert!(c.same_as(&c.clone()));
    assert!(!c.same_as(&a));
    assert_eq!(c.to_string(), "custom (mystery)");
}

#[test]
fn datum_groups() {
    assert!(Datum::from_name("D_North_American_1983").compatible_with(&Datum::Wgs84Compatible));
    assert!(!Datum::from_name("D_North_American_1927").compatible_with(&Datum::Wgs84Compatible));
    assert!(Datum::from_name("Potsdam").compatible_with(&Datum::from_name("potsdam")));
}
