use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{Value, json};

use server::entity::{restaurant_cuisine, review};

use crate::common::{TestApp, routes};

mod restaurant_creation {
    use super::*;

    #[tokio::test]
    async fn owner_creates_restaurant_with_empty_rating() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;

        let res = app
            .post_with_token(
                routes::RESTAURANTS,
                &json!({
                    "name": "  Pyra Bar  ",
                    "address": {"street": "Strzelecka 13", "city": "Poznań", "postal_code": "61-845"},
                    "location": {"latitude": 52.4035, "longitude": 16.9312},
                    "cuisines": ["polish", "fast_food"],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Pyra Bar");
        assert_eq!(res.body["description"], "");
        assert_eq!(res.body["address"]["country"], "Polska");
        assert_eq!(res.body["average_rating"], 0.0);
        assert_eq!(res.body["total_reviews"], 0);
        assert_eq!(res.body["owner"]["username"], "owner");
        assert_eq!(res.body["cuisines"], json!(["polish", "fast_food"]));
        assert!(res.body["image_url"].is_null());
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::RESTAURANTS, &json!({"name": "Nope"}))
            .await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn unknown_cuisine_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;

        let res = app
            .post_with_token(
                routes::RESTAURANTS,
                &json!({
                    "name": "Molecular",
                    "address": {"street": "a", "city": "b", "postal_code": "c"},
                    "location": {"latitude": 52.0, "longitude": 16.0},
                    "cuisines": ["molecular"],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn out_of_range_location_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;

        let res = app
            .post_with_token(
                routes::RESTAURANTS,
                &json!({
                    "name": "North Pole Diner",
                    "address": {"street": "a", "city": "b", "postal_code": "c"},
                    "location": {"latitude": 95.0, "longitude": 16.0},
                    "cuisines": ["american"],
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }
}

mod restaurant_listing {
    use super::*;

    #[tokio::test]
    async fn lists_sorted_by_name_with_pagination() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;
        for name in ["Cebularz", "Angelo", "Bistro Nowe"] {
            app.create_restaurant(&token, name).await;
        }

        let res = app
            .get_without_token(&format!("{}?per_page=2", routes::RESTAURANTS))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let names: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Angelo", "Bistro Nowe"]);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
        for item in res.body["data"].as_array().unwrap() {
            assert_eq!(item["owner"]["username"], "owner", "{item}");
            assert_eq!(item["cuisines"], json!(["polish"]), "{item}");
        }
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_escapes_wildcards() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;
        app.create_restaurant(&token, "Pizzeria Roma").await;
        app.create_restaurant(&token, "Sushi 100%").await;

        let res = app
            .get_without_token(&format!("{}?search=PIZZ", routes::RESTAURANTS))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Pizzeria Roma");

        let res = app
            .get_without_token(&format!("{}?search=%25", routes::RESTAURANTS))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Sushi 100%");
    }

    #[tokio::test]
    async fn cuisine_filter_matches_any_tag() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;
        app.create_restaurant_at(&token, "Roma", &["italian", "pizza"], 52.4, 16.9)
            .await;
        app.create_restaurant_at(&token, "Koi", &["sushi"], 52.4, 16.9)
            .await;
        app.create_restaurant_at(&token, "Pierogi", &["polish"], 52.4, 16.9)
            .await;

        let res = app
            .get_without_token(&format!("{}?cuisine=pizza,sushi", routes::RESTAURANTS))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn proximity_filter_limits_by_radius_and_reports_distance() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;
        // Poznań old town and Kraków, roughly 335 km apart.
        app.create_restaurant_at(&token, "Poznań", &["polish"], 52.4082, 16.9335)
            .await;
        app.create_restaurant_at(&token, "Kraków", &["polish"], 50.0614, 19.9445)
            .await;

        let res = app
            .get_without_token(&format!(
                "{}?lat=52.4064&lng=16.9252&radius=5000",
                routes::RESTAURANTS
            ))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Poznań");
        let distance = res.body["data"][0]["distance_m"].as_f64().unwrap();
        assert!(distance > 0.0 && distance < 5000.0, "got {distance}");
    }

    #[tokio::test]
    async fn proximity_results_are_nearest_first_by_default() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;
        // Names sort opposite to distance from the query point.
        app.create_restaurant_at(&token, "Zielona Weranda", &["polish"], 52.4066, 16.9254)
            .await;
        app.create_restaurant_at(&token, "Marcinkowski", &["polish"], 52.4100, 16.9300)
            .await;
        app.create_restaurant_at(&token, "Alfa Grill", &["polish"], 52.4300, 16.9500)
            .await;

        let res = app
            .get_without_token(&format!("{}?lat=52.4064&lng=16.9252", routes::RESTAURANTS))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let items = res.body["data"].as_array().unwrap();
        let names: Vec<&str> = items.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["Zielona Weranda", "Marcinkowski", "Alfa Grill"]);
        let distances: Vec<f64> = items
            .iter()
            .map(|r| r["distance_m"].as_f64().unwrap())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]), "{distances:?}");

        // An explicit sort key still wins; distance can be requested in reverse.
        let res = app
            .get_without_token(&format!(
                "{}?lat=52.4064&lng=16.9252&sort_by=name",
                routes::RESTAURANTS
            ))
            .await;
        assert_eq!(res.body["data"][0]["name"], "Alfa Grill");

        let res = app
            .get_without_token(&format!(
                "{}?lat=52.4064&lng=16.9252&sort_by=distance&sort_order=desc",
                routes::RESTAURANTS
            ))
            .await;
        assert_eq!(res.body["data"][0]["name"], "Alfa Grill");
        assert_eq!(res.body["data"][2]["name"], "Zielona Weranda");
    }

    #[tokio::test]
    async fn distance_sort_requires_a_point() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?sort_by=distance", routes::RESTAURANTS))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn lat_without_lng_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?lat=52.4", routes::RESTAURANTS))
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_sort_key_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?sort_by=owner", routes::RESTAURANTS))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn mine_lists_only_own_restaurants() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;
        let other = app.create_authenticated_user("other", "password123").await;
        app.create_restaurant(&owner, "Mine").await;
        app.create_restaurant(&other, "Theirs").await;

        let res = app.get_with_token(routes::MY_RESTAURANTS, &owner).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Mine");
    }

    #[tokio::test]
    async fn every_listed_restaurant_carries_its_owner_and_cuisines() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;
        let other = app.create_authenticated_user("other", "password123").await;
        app.create_restaurant_at(&owner, "Alfa", &["polish", "pizza"], 52.40, 16.92)
            .await;
        app.create_restaurant_at(&owner, "Beta", &["sushi"], 52.41, 16.93)
            .await;
        app.create_restaurant_at(&owner, "Gamma", &["polish"], 52.42, 16.94)
            .await;
        app.create_restaurant_at(&other, "Delta", &["pizza"], 52.43, 16.95)
            .await;

        let res = app.get_with_token(routes::MY_RESTAURANTS, &owner).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let items = res.body["data"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        for item in items {
            assert_eq!(item["owner"]["username"], "owner", "{item}");
            assert!(!item["cuisines"].as_array().unwrap().is_empty(), "{item}");
        }

        let res = app.get_without_token(routes::RESTAURANTS).await;
        let by_name: Vec<(&str, &str, Value)> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| {
                (
                    r["name"].as_str().unwrap(),
                    r["owner"]["username"].as_str().unwrap(),
                    r["cuisines"].clone(),
                )
            })
            .collect();
        assert_eq!(
            by_name,
            [
                ("Alfa", "owner", json!(["polish", "pizza"])),
                ("Beta", "owner", json!(["sushi"])),
                ("Delta", "other", json!(["pizza"])),
                ("Gamma", "owner", json!(["polish"])),
            ]
        );
    }
}

mod restaurant_detail {
    use super::*;

    #[tokio::test]
    async fn anonymous_detail_has_no_user_review() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;
        let critic = app.create_authenticated_user("critic", "password123").await;
        let id = app.create_restaurant(&owner, "Roma").await;
        app.submit_review(&critic, id, 4, "Dobre").await;

        let res = app.get_without_token(&routes::restaurant(id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["restaurant"]["name"], "Roma");
        assert_eq!(res.body["reviews"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["reviews"][0]["user"]["username"], "critic");
        assert!(res.body["user_review"].is_null());
    }

    #[tokio::test]
    async fn authenticated_detail_includes_own_review() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;
        let critic = app.create_authenticated_user("critic", "password123").await;
        let id = app.create_restaurant(&owner, "Roma").await;
        app.submit_review(&critic, id, 4, "Dobre").await;

        let res = app.get_with_token(&routes::restaurant(id), &critic).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["user_review"]["rating"], 4);
    }

    #[tokio::test]
    async fn missing_restaurant_is_404() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::restaurant(9999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }
}

mod restaurant_update {
    use super::*;

    #[tokio::test]
    async fn owner_can_patch_fields_and_cuisines() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;
        let id = app.create_restaurant(&token, "Roma").await;

        let res = app
            .patch_with_token(
                &routes::restaurant(id),
                &json!({"name": "Roma Nuova", "cuisines": ["italian", "pizza"]}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Roma Nuova");
        assert_eq!(res.body["cuisines"], json!(["italian", "pizza"]));

        let stored = restaurant_cuisine::Entity::find()
            .filter(restaurant_cuisine::Column::RestaurantId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(stored, 2);
    }

    #[tokio::test]
    async fn rating_fields_cannot_be_written() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("owner", "password123").await;
        let id = app.create_restaurant(&token, "Roma").await;

        let res = app
            .patch_with_token(
                &routes::restaurant(id),
                &json!({"average_rating": 5.0, "total_reviews": 100}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.rating_of(id).await, (0.0, 0));
    }

    #[tokio::test]
    async fn non_owner_cannot_patch() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;
        let other = app.create_authenticated_user("other", "password123").await;
        let id = app.create_restaurant(&owner, "Roma").await;

        let res = app
            .patch_with_token(&routes::restaurant(id), &json!({"name": "Hijacked"}), &other)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");
    }
}

mod restaurant_deletion {
    use super::*;

    #[tokio::test]
    async fn deletion_cascades_to_reviews_and_cuisines() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;
        let a = app.create_authenticated_user("critic_a", "password123").await;
        let b = app.create_authenticated_user("critic_b", "password123").await;
        let id = app.create_restaurant(&owner, "Roma").await;
        let other_id = app.create_restaurant(&owner, "Koi").await;
        app.submit_review(&a, id, 5, "").await;
        app.submit_review(&b, id, 3, "").await;
        app.submit_review(&a, other_id, 4, "").await;

        let res = app.delete_with_token(&routes::restaurant(id), &owner).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let res = app.get_without_token(&routes::restaurant(id)).await;
        assert_eq!(res.status, 404);

        let remaining = review::Entity::find()
            .filter(review::Column::RestaurantId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        let cuisines = restaurant_cuisine::Entity::find()
            .filter(restaurant_cuisine::Column::RestaurantId.eq(id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(cuisines, 0);

        // Unrelated restaurant is untouched.
        assert_eq!(app.rating_of(other_id).await, (4.0, 1));
    }

    #[tokio::test]
    async fn non_owner_delete_is_forbidden_and_changes_nothing() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;
        let other = app.create_authenticated_user("other", "password123").await;
        let id = app.create_restaurant(&owner, "Roma").await;
        app.submit_review(&other, id, 2, "").await;

        let res = app.delete_with_token(&routes::restaurant(id), &other).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");
        assert_eq!(app.rating_of(id).await, (2.0, 1));
    }

    #[tokio::test]
    async fn deleting_missing_restaurant_is_404() {
        let app = TestApp::spawn().await;
        let owner = app.create_authenticated_user("owner", "password123").await;

        let res = app.delete_with_token(&routes::restaurant(4242), &owner).await;

        assert_eq!(res.status, 404);
    }
}
