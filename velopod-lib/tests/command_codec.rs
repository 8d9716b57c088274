//! Tests for the command catalog: request framing, response payloads,
//! and device-side dispatch

mod common;

use common::*;
use bytes::BytesMut;

#[test]
fn requests_lead_with_their_identifier() {
    assert_eq!(GetFileList.to_binary().as_ref(), &[0x21]);
    assert_eq!(GetSerialNumber.to_binary().as_ref(), &[0x09]);
    assert_eq!(EraseAll.to_binary().as_ref(), &[0x07]);
    assert_eq!(Unknown22.to_binary().as_ref(), &[0x22]);
    assert_eq!(
        GetFile { ride_number: 3 }.to_binary().as_ref(),
        &[0x20, 0x03, 0x00]
    );
}

#[test]
fn firmware_version_encoding_matches_device() {
    // 6.12 -> 6.12 * 100 + 500 = 1112 = 0x0458, little-endian.
    let response = FirmwareVersionResponse::from_version(6.12);
    assert_eq!(response.version_encoded, 1112);
    assert_eq!(response.to_binary().as_ref(), &[0x58, 0x04]);
    assert!((response.version() - 6.12).abs() < 0.005);

    // At or below 2.00 the +500 offset is absent.
    let old = FirmwareVersionResponse::from_version(1.39);
    assert_eq!(old.version_encoded, 139);
    assert!((old.version() - 1.39).abs() < 0.005);
}

#[test]
fn set_odometer_wire_form() {
    // 1234.5 km -> 12345 tenths -> 0x00003039 LE.
    let cmd = SetOdometer::from_km(1234.5);
    assert_eq!(cmd.tenths_km, 12345);
    assert_eq!(cmd.to_binary().as_ref(), &[0x0B, 0x39, 0x30, 0x00, 0x00]);
}

#[test]
fn empty_file_list_payload() {
    let response = FileListResponse { headers: vec![] };
    assert_eq!(response.to_binary().as_ref(), &[0x00, 0x00]);
    assert!(FileListResponse::from_binary(&[0x00, 0x00]).unwrap().headers.is_empty());
}

#[test]
fn file_list_counts_and_round_trips() {
    let ride = NewtonRide::make(vec![sample_record(10.0, 100); 60]);
    let response = FileListResponse {
        headers: vec![ride.header(), ride.header()],
    };
    let wire = response.to_binary();
    assert_eq!(wire.len(), 2 + 2 * RIDE_LIST_HEADER_SIZE);
    assert_eq!(FileListResponse::from_binary(&wire).unwrap(), response);
}

#[test]
fn profile_data_response_length_prefix_is_total_bytes() {
    let response = ProfileDataResponse {
        profiles: [NewtonProfile::default(); 4],
    };
    let wire = response.to_binary();
    assert_eq!(wire.len(), 4 + 4 * PROFILE_SIZE);
    assert_eq!(&wire[..4], &328i32.to_le_bytes());
    assert_eq!(ProfileDataResponse::from_binary(&wire).unwrap(), response);

    // A count-style prefix (the other historical reading) is refused.
    let mut bad = wire.to_vec();
    bad[..4].copy_from_slice(&4i32.to_le_bytes());
    assert!(ProfileDataResponse::from_binary(&bad).is_err());
}

#[test]
fn all_screens_response_round_trips() {
    let mut screens = [NewtonProfileScreens::default(); 4];
    screens[2].0[0] = 0x5A;
    let response = AllScreensResponse { screens };
    let wire = response.to_binary();
    assert_eq!(wire.len(), 4 + 4 * SCREENS_SIZE);
    assert_eq!(&wire[..4], &72i32.to_le_bytes());
    assert_eq!(AllScreensResponse::from_binary(&wire).unwrap(), response);
}

#[test]
fn set_time_requires_the_leading_flag_byte() {
    let cmd = SetTime {
        unknown: 0,
        newton_time: NewtonTime::default(),
    };
    let wire = cmd.to_binary();
    assert_eq!(wire.len(), 1 + 1 + TIME_SIZE);
    assert_eq!(DeviceRequest::decode(&wire).unwrap(), DeviceRequest::SetTime(cmd));

    // The bare-time variant seen from some peers is not accepted.
    let mut short = wire.to_vec();
    short.remove(1);
    assert!(DeviceRequest::decode(&short).is_err());
}

#[test]
fn set_intervals_round_trips_with_count_header() {
    let cmd = SetIntervals {
        unknown_0: 1,
        intervals: vec![
            IntervalRecord {
                target_watts: 250,
                work_secs: 120,
                rest_secs: 60,
            },
            IntervalRecord {
                target_watts: 300,
                work_secs: 60,
                rest_secs: 90,
            },
        ],
    };
    let mut buf = BytesMut::new();
    cmd.encode_payload(&mut buf);
    assert_eq!(buf.len(), 3 + 2 * 6);
    assert_eq!(&buf[..2], &2i16.to_le_bytes());
    assert_eq!(SetIntervals::decode_payload(&buf).unwrap(), cmd);
}

#[test]
fn set_profile_data_scales_tilt() {
    let cmd = SetProfileData {
        total_mass_lb: 205,
        user_edited: 0x8009,
        wheel_circumference_mm: 2096,
        sample_smoothing: 10251,
        aero: 0.4889,
        fric: 11.311,
        unknown_6: 0.0,
        unknown_7: 0.0,
        wind_scaling_sqrt: 1.151,
        speed_id: 0,
        cadence_id: 0,
        hr_id: 0,
        power_id: 0,
        speed_type: 0,
        cadence_type: 0,
        hr_type: 0,
        power_type: 0,
        tilt_cal: -0.5,
        cal_mass_lb: 205,
        rider_mass_lb: 180,
        unknown_9: 1803,
        ftp_per_kilo_ish: 1,
        ftp_over_095: 85,
    };
    let mut buf = BytesMut::new();
    cmd.encode_payload(&mut buf);
    assert_eq!(buf.len(), 52);
    let decoded = SetProfileData::decode_payload(&buf).unwrap();
    assert_eq!(decoded, cmd);

    // The tilt field is tenths on the wire: -0.5 -> -5 -> 0xFFFB.
    assert_eq!(&buf[40..42], &(-5i16).to_le_bytes());
}

#[test]
fn dispatch_rejects_unknown_identifiers_and_empty_messages() {
    assert!(matches!(
        DeviceRequest::decode(&[0x55]),
        Err(NewtonError::UnknownCommand(0x55))
    ));
    assert!(DeviceRequest::decode(&[]).is_err());
}

#[test]
fn dispatch_decodes_the_whole_catalog() {
    let messages: Vec<Bytes> = vec![
        UploadFirmware { payload: Bytes::from_static(b"blob") }.to_binary(),
        SetTime { unknown: 0, newton_time: NewtonTime::default() }.to_binary(),
        EraseAll.to_binary(),
        GetSpaceUsage.to_binary(),
        GetSerialNumber.to_binary(),
        SetUnits { units: Units::Metric }.to_binary(),
        SetOdometer::from_km(12.3).to_binary(),
        SetSampleRate { unknown: 0, sample_rate: 5 }.to_binary(),
        GetOdometer.to_binary(),
        GetFirmwareVersion.to_binary(),
        SetTrainerWeights { weights: [1.0, 2.0, 3.0, 4.0] }.to_binary(),
        SetIntervals { unknown_0: 0, intervals: vec![] }.to_binary(),
        GetProfileNumber.to_binary(),
        SetProfileNumber { number: 2 }.to_binary(),
        SetProfileData2 { power_smoothing_seconds: 5, unknown_a: 50 }.to_binary(),
        GetProfileData.to_binary(),
        GetFile { ride_number: 0 }.to_binary(),
        GetFileList.to_binary(),
        Unknown22.to_binary(),
        SetScreens { screens: NewtonProfileScreens::default() }.to_binary(),
        GetAllScreens.to_binary(),
    ];
    for message in messages {
        let request = DeviceRequest::decode(&message)
            .unwrap_or_else(|e| panic!("decode failed for {:02x?}: {e}", message.as_ref()));
        assert_eq!(u8::from(request.id()), message[0]);
    }
}

#[test]
fn units_wire_values() {
    assert_eq!(i16::from(Units::English), 0);
    assert_eq!(i16::from(Units::Metric), 1);
    assert!(SetUnits::decode_payload(&[0x02, 0x00]).is_err());
}

#[test]
fn space_usage_response_round_trips() {
    let response = SpaceUsageResponse { used_percentage: 199 };
    assert_eq!(response.to_binary().as_ref(), &[0xC7, 0x00]);
    assert_eq!(SpaceUsageResponse::from_binary(&[0xC7, 0x00]).unwrap(), response);
}

#[test]
fn serial_number_formats_dashed_hex() {
    let response = SerialNumberResponse { serial_number: [0u8; 16] };
    assert_eq!(
        response.formatted(),
        "00-00-00-00-00-00-00-00-00-00-00-00-00-00-00-00"
    );
}
