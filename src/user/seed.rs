//! Demo fixtures used to reset the store.

use chrono::{DateTime, Utc};

use crate::user::{ObjectId, User};

struct Fixture {
    name: &'static str,
    email: &'static str,
    is_admin: bool,
    bio: &'static str,
    image: &'static str,
}

const FIXTURES: [Fixture; 5] = [
    Fixture {
        name: "John Doe",
        email: "john@example.com",
        is_admin: true,
        bio: "Software engineer and tech enthusiast.",
        image: "https://i.pravatar.cc/150?img=1",
    },
    Fixture {
        name: "Jane Smith",
        email: "jane@example.com",
        is_admin: false,
        bio: "UX designer with a passion for creating beautiful interfaces.",
        image: "https://i.pravatar.cc/150?img=5",
    },
    Fixture {
        name: "Mohamed Ahmed",
        email: "mohamed@example.com",
        is_admin: false,
        bio: "Full-stack developer specializing in React and Node.js.",
        image: "https://i.pravatar.cc/150?img=3",
    },
    Fixture {
        name: "Sarah Johnson",
        email: "sarah@example.com",
        is_admin: false,
        bio: "Product manager with 5 years of experience in tech startups.",
        image: "https://i.pravatar.cc/150?img=8",
    },
    Fixture {
        name: "Khaled Omar",
        email: "khaled@example.com",
        is_admin: true,
        bio: "DevOps engineer specializing in cloud infrastructure.",
        image: "https://i.pravatar.cc/150?img=11",
    },
];

/// Fixture users with fresh ids and timestamps.
pub fn fixtures(now: DateTime<Utc>) -> Vec<User> {
    FIXTURES
        .iter()
        .map(|f| User {
            id: ObjectId::new(),
            name: f.name.to_owned(),
            email: f.email.to_owned(),
            image: f.image.to_owned(),
            bio: f.bio.to_owned(),
            is_admin: f.is_admin,
            created_at: now,
            updated_at: now,
        })
        .collect()
}
