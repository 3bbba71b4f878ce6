#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use uuid::Uuid;
    use crate::images::{placeholder_by_id, ImageSource};
    use crate::models::*;
    use crate::validation::*;
    use crate::voting_logic::{compute_results, VotingError};
    use crate::identity::{anonymous_id, Identity};

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn contestant(name: &str) -> ContestantForm {
        ContestantForm {
            id: None,
            name: name.into(),
            face_image: PNG.into(),
            team_logo: None,
        }
    }

    fn form(title: &str, names: &[&str]) -> VotingForm {
        VotingForm {
            title: title.into(),
            contestants: names.iter().map(|n| contestant(n)).collect(),
        }
    }

    fn voting(names: &[&str]) -> Voting {
        Voting::create(&form("Best Dev Framework", names), "owner", ValidationRules::default()).unwrap()
    }

    fn id_of(v: &Voting, name: &str) -> Uuid {
        v.contestants.iter().find(|c| c.name == name).unwrap().id
    }

    fn votes(v: &Voting) -> Vec<u64> {
        v.contestants.iter().map(|c| c.votes).collect()
    }

    #[test]
    fn test_create_voting() {
        let v = voting(&["React", "Vue", "Angular"]);
        assert_eq!(v.status, VotingStatus::Open);
        assert_eq!(v.contestants.len(), 3);
        assert!(v.contestants.iter().all(|c| c.votes == 0));
        assert_eq!(v.owner_id, "owner");

        let ids: HashSet<_> = v.contestants.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 3);
        assert_ne!(v.id, voting(&["React", "Vue"]).id);
    }

    #[test]
    fn test_create_ignores_given_ids_and_trims() {
        let mut f = form("  Padded title  ", &["A", "B"]);
        let given = Uuid::new_v4();
        f.contestants[0].id = Some(given);
        f.contestants[1].name = "  B  ".into();

        let v = Voting::create(&f, "owner", ValidationRules::default()).unwrap();
        assert_eq!(v.title, "Padded title");
        assert_eq!(v.contestants[1].name, "B");
        assert_ne!(v.contestants[0].id, given);
    }

    #[test]
    fn test_form_validation() {
        let rules = ValidationRules::default();
        assert!(matches!(
            validate_voting_form(&form("ab", &["A", "B"]), rules),
            Err(ValidationError::TitleTooShort)
        ));
        assert!(matches!(
            validate_voting_form(&form("  ab  ", &["A", "B"]), rules),
            Err(ValidationError::TitleTooShort)
        ));
        assert!(matches!(
            validate_voting_form(&form(&"x".repeat(MAX_TITLE_LENGTH + 1), &["A", "B"]), rules),
            Err(ValidationError::TitleTooLong)
        ));
        assert!(matches!(
            validate_voting_form(&form("Solo", &["A"]), rules),
            Err(ValidationError::TooFewContestants)
        ));
        assert!(matches!(
            validate_voting_form(&form("Solo", &["A", " "]), rules),
            Err(ValidationError::EmptyName)
        ));
        assert!(matches!(
            validate_voting_form(&form("Twins", &["Alice", "alice"]), rules),
            Err(ValidationError::DuplicateContestant(_))
        ));

        let names: Vec<String> = (0..=MAX_CONTESTANTS).map(|i| format!("C{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert!(matches!(
            validate_voting_form(&form("Crowded", &names), rules),
            Err(ValidationError::TooManyContestants)
        ));

        assert!(validate_voting_form(&form("Fine", &["A", "B"]), rules).is_ok());
    }

    #[test]
    fn test_face_image_rules() {
        let mut f = form("Faces", &["A", "B"]);
        f.contestants[1].face_image.clear();

        assert!(matches!(
            validate_voting_form(&f, ValidationRules::default()),
            Err(ValidationError::MissingFaceImage(name)) if name == "B"
        ));
        assert!(validate_voting_form(&f, ValidationRules { require_face_image: false }).is_ok());

        f.contestants[1].face_image = "ftp://example.com/a.png".into();
        assert!(matches!(
            validate_voting_form(&f, ValidationRules { require_face_image: false }),
            Err(ValidationError::InvalidImage(_))
        ));

        f.contestants[1].face_image = PNG.into();
        f.contestants[1].team_logo = Some("data:text/plain;base64,aGVsbG8=".into());
        assert!(matches!(
            validate_voting_form(&f, ValidationRules::default()),
            Err(ValidationError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_image_classification() {
        assert_eq!(
            ImageSource::classify(PNG),
            Ok(ImageSource::Inline { mime: "image/png", size: 8 })
        );

        let placeholder = placeholder_by_id("contestant-2").unwrap();
        assert_eq!(ImageSource::classify("contestant-2"), Ok(ImageSource::Placeholder(placeholder)));
        assert_eq!(
            ImageSource::classify(placeholder.image_url),
            Ok(ImageSource::Placeholder(placeholder))
        );
        assert_eq!(
            ImageSource::classify("https://cdn.example.com/logo.svg"),
            Ok(ImageSource::Remote("https://cdn.example.com/logo.svg"))
        );

        assert!(matches!(
            ImageSource::classify("data:image/png;base64,!!!"),
            Err(ValidationError::InvalidImage(_))
        ));
        assert!(matches!(
            ImageSource::classify("data:image/png,raw"),
            Err(ValidationError::InvalidImage(_))
        ));
        assert!(matches!(ImageSource::classify(""), Err(ValidationError::InvalidImage(_))));

        let huge = format!("data:image/jpeg;base64,{}", STANDARD.encode(vec![0u8; MAX_IMAGE_BYTES + 1]));
        assert!(matches!(ImageSource::classify(&huge), Err(ValidationError::ImageTooLarge)));
    }

    #[test]
    fn test_record_vote() {
        let mut v = voting(&["React", "Vue", "Angular"]);
        let vue = id_of(&v, "Vue");

        assert_eq!(v.record_vote(vue).unwrap(), 1);
        assert_eq!(votes(&v), vec![0, 1, 0]);

        let stranger = Uuid::new_v4();
        assert!(matches!(v.record_vote(stranger), Err(VotingError::UnknownContestant(id)) if id == stranger));
        assert_eq!(votes(&v), vec![0, 1, 0]);
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_votes() {
        let mut v = voting(&["A", "B"]);
        let a = id_of(&v, "A");
        v.record_vote(a).unwrap();

        assert!(v.close());
        let once = v.clone();
        assert!(!v.close());
        assert_eq!(v, once);

        assert!(matches!(v.record_vote(a), Err(VotingError::Closed)));
        assert!(matches!(v.ensure_open(), Err(VotingError::Closed)));
        assert_eq!(votes(&v), vec![1, 0]);
    }

    #[test]
    fn test_results_scenario() {
        let mut v = voting(&["React", "Vue", "Angular"]);
        let (react, vue, angular) = (id_of(&v, "React"), id_of(&v, "Vue"), id_of(&v, "Angular"));
        v.record_vote(react).unwrap();
        v.record_vote(react).unwrap();
        v.record_vote(vue).unwrap();

        let results = compute_results(&v);
        let ranked: Vec<_> = results.standings.iter().map(|s| (s.name.as_str(), s.votes)).collect();
        assert_eq!(ranked, vec![("React", 2), ("Vue", 1), ("Angular", 0)]);
        assert_eq!(results.winner.as_ref().map(|w| w.contestant_id), Some(react));
        assert_eq!(results.total_votes, 3);
        assert!(!results.is_final);

        v.close();
        assert!(matches!(v.record_vote(angular), Err(VotingError::Closed)));
        let results = compute_results(&v);
        assert!(results.is_final);
        assert_eq!(results.status, VotingStatus::Closed);
        let ranked: Vec<_> = results.standings.iter().map(|s| s.votes).collect();
        assert_eq!(ranked, vec![2, 1, 0]);
    }

    #[test]
    fn test_results_ties_keep_insertion_order() {
        let mut v = voting(&["A", "B", "C", "D"]);
        let (b, d) = (id_of(&v, "B"), id_of(&v, "D"));
        v.record_vote(d).unwrap();
        v.record_vote(b).unwrap();

        let results = compute_results(&v);
        let order: Vec<_> = results.standings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
        let ranks: Vec<_> = results.standings.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert!((results.standings[0].share - 50.0).abs() < f64::EPSILON);
        assert_eq!(results.standings[2].share, 0.0);
    }

    #[test]
    fn test_no_winner_without_votes() {
        let v = voting(&["A", "B"]);
        let results = compute_results(&v);
        assert!(results.winner.is_none());
        assert_eq!(results.total_votes, 0);
        let order: Vec<_> = results.standings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, vec!["A", "B"]);
        assert!(results.standings.iter().all(|s| s.share == 0.0));
    }

    #[test]
    fn test_update_round_trip_is_noop() {
        let mut v = voting(&["A", "B", "C"]);
        let b = id_of(&v, "B");
        v.record_vote(b).unwrap();
        v.contestants[2].team_logo = Some("team-logo-1".into());

        let before = v.clone();
        let patch = v.plan_update(&v.to_form(), ValidationRules::default(), true).unwrap();
        assert!(patch.removed.is_empty());
        v.apply_patch(patch);
        assert_eq!(v, before);
    }

    #[test]
    fn test_update_merges_contestants() {
        let mut v = voting(&["A", "B", "C"]);
        let a = id_of(&v, "A");
        v.record_vote(a).unwrap();

        let mut f = v.to_form();
        f.title = "Renamed".into();
        f.contestants[0].name = "Alpha".into();
        f.contestants.remove(2);
        f.contestants.push(contestant("D"));

        let patch = v.plan_update(&f, ValidationRules::default(), false).unwrap();
        v.apply_patch(patch);

        assert_eq!(v.title, "Renamed");
        let names: Vec<_> = v.contestants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "B", "C", "D"]);
        assert_eq!(votes(&v), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_update_prunes_dropped_contestants() {
        let mut v = voting(&["A", "B", "C"]);
        let c = id_of(&v, "C");

        let mut f = v.to_form();
        f.contestants.remove(2);
        let patch = v.plan_update(&f, ValidationRules::default(), true).unwrap();
        assert_eq!(patch.removed, vec![c]);

        v.apply_patch(patch);
        assert_eq!(v.contestants.len(), 2);
        assert!(v.contestant(c).is_none());
    }

    #[test]
    fn test_update_limits_apply_to_merged_contestants() {
        let names: Vec<String> = (0..MAX_CONTESTANTS).map(|i| format!("C{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let v = voting(&names);

        // Kept contestants plus twenty new ones would exceed the cap.
        let fresh: Vec<String> = (0..MAX_CONTESTANTS).map(|i| format!("N{i}")).collect();
        let fresh: Vec<&str> = fresh.iter().map(String::as_str).collect();
        assert_eq!(
            v.plan_update(&form("Best Dev Framework", &fresh), ValidationRules::default(), false),
            Err(VotingError::Invalid(ValidationError::TooManyContestants))
        );

        // With pruning the dropped ones go, so the same form fits.
        assert!(v.plan_update(&form("Best Dev Framework", &fresh), ValidationRules::default(), true).is_ok());
    }

    #[test]
    fn test_update_rejects_names_clashing_with_kept_contestants() {
        let v = voting(&["C0", "C1", "C2"]);

        assert_eq!(
            v.plan_update(&form("Best Dev Framework", &["c0", "Other"]), ValidationRules::default(), false),
            Err(VotingError::Invalid(ValidationError::DuplicateContestant("c0".into())))
        );

        // Renaming in place and swapping names between listed contestants is fine.
        let mut f = v.to_form();
        f.contestants[0].name = "C1".into();
        f.contestants[1].name = "C0".into();
        assert!(v.plan_update(&f, ValidationRules::default(), false).is_ok());
    }

    #[test]
    fn test_update_rejects_foreign_contestant() {
        let v = voting(&["A", "B"]);
        let mut f = v.to_form();
        let foreign = Uuid::new_v4();
        f.contestants[1].id = Some(foreign);

        assert!(matches!(
            v.plan_update(&f, ValidationRules::default(), false),
            Err(VotingError::UnknownContestant(id)) if id == foreign
        ));

        let mut f = v.to_form();
        f.contestants[1].id = f.contestants[0].id;
        f.contestants[1].name = "Other".into();
        assert!(matches!(
            v.plan_update(&f, ValidationRules::default(), false),
            Err(VotingError::Invalid(ValidationError::DuplicateContestantId(_)))
        ));
    }

    #[test]
    fn test_anonymous_ids() {
        assert_eq!(anonymous_id("token-a"), anonymous_id("token-a"));
        assert_ne!(anonymous_id("token-a"), anonymous_id("token-b"));
        assert!(!anonymous_id("token-a").contains("token-a"));
        assert_eq!(Identity::from_token("t").anonymous_id, anonymous_id("t"));
    }

    #[test]
    fn test_wire_format() {
        let v = voting(&["A", "B"]);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["status"], "open");
        assert!(json["contestants"][0]["faceImage"].is_string());
        assert!(json["contestants"][0].get("teamLogo").is_none());
        assert!(json.get("ownerId").is_some());

        let parsed: VotingForm = serde_json::from_str(
            r#"{"title":"Lunch","contestants":[{"name":"Pizza"},{"name":"Sushi","teamLogo":"team-logo-2"}]}"#
        ).unwrap();
        assert_eq!(parsed.contestants[0].face_image, "");
        assert_eq!(parsed.contestants[1].team_logo.as_deref(), Some("team-logo-2"));
    }
}
